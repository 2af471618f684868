//! Caller authorization for dispatch requests.

use crate::{error::Result, Error, UserId};

/// Allows a dispatch only when the authenticated caller is the target user.
///
/// `caller` is the identity established by session or token verification
/// upstream; `None` means no identity could be established.
pub fn check_caller(caller: Option<&UserId>, target: &UserId) -> Result<()> {
    match caller {
        Some(caller) if !caller.as_str().is_empty() && caller == target => Ok(()),
        _ => Err(Error::Forbidden),
    }
}
