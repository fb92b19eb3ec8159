use http::StatusCode;

/// Whether a status code counts as a successful outcome (2xx).
pub fn is_success_status(status: StatusCode) -> bool {
    status.is_success()
}

/// The redirect codes the execution engine is willing to follow.
pub fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Whether a redirect code carries see-other semantics, which force the
/// next attempt onto GET without a body.
pub(crate) fn is_see_other_status(status: StatusCode) -> bool {
    status == StatusCode::SEE_OTHER
}

#[cfg(test)]
mod tests {
    use super::{is_redirect_status, is_success_status};
    use http::StatusCode;

    #[test]
    fn success_is_the_2xx_range() {
        assert!(is_success_status(StatusCode::OK));
        assert!(is_success_status(StatusCode::NO_CONTENT));
        assert!(!is_success_status(StatusCode::MOVED_PERMANENTLY));
        assert!(!is_success_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn redirect_set_covers_the_followable_codes() {
        for code in [301_u16, 302, 303, 307, 308] {
            let status = StatusCode::from_u16(code).expect("valid status");
            assert!(is_redirect_status(status), "{code} should be a redirect");
        }
        assert!(!is_redirect_status(StatusCode::NOT_MODIFIED));
        assert!(!is_redirect_status(StatusCode::OK));
    }
}
