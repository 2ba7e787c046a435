use crate::error::AppError;

/// Who is asking. Built once per request by the auth middleware and handed
/// to every operation explicitly.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub viewer_id: i64,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("forbidden"))
        }
    }
}
