use super::{Identity, Role};
use crate::error::{ApiError, ApiResult};

/// One browser holds one session slot: a customer cannot log in while a
/// pharmacy token is presented, and the other way round. Invalid or absent
/// tokens leave the slot free.
pub fn ensure_slot_free(current: &Identity, logging_in_as: Role) -> ApiResult<()> {
    match current.role() {
        Some(holder) if holder != logging_in_as => Err(ApiError::forbidden(format!(
            "A {0} is currently logged in. Please logout the {0} first.",
            holder.as_str()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_role_holds_the_slot() {
        let err = ensure_slot_free(&Identity::Pharmacy("p1".into()), Role::Customer).unwrap_err();
        assert_eq!(
            err.to_string(),
            "A pharmacy is currently logged in. Please logout the pharmacy first."
        );
    }

    #[test]
    fn same_role_or_no_session_is_free() {
        assert!(ensure_slot_free(&Identity::Customer("c1".into()), Role::Customer).is_ok());
        assert!(ensure_slot_free(&Identity::Anonymous, Role::Pharmacy).is_ok());
        assert!(ensure_slot_free(&Identity::Invalid, Role::Pharmacy).is_ok());
    }
}
