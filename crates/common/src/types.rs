/// External identity that may be permitted or denied interaction with the
/// gateway. Matches the Telegram chat id domain.
pub type PrincipalId = i64;
