use std::sync::Arc;

use {async_trait::async_trait, tracing::warn};

use {
    waypost_channels::{Inbound, Outbound},
    waypost_common::{PrincipalId, error::DENIED_MESSAGE},
    waypost_roster::RosterStore,
};

use crate::{
    broadcast::broadcast_message,
    gate::{AccessGate, Role},
};

// ── Command surface ──────────────────────────────────────────────────────────

/// The transport-agnostic inbound command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { code: Option<String> },
    Client,
    Help,
    Send { text: String },
    Revoke,
    Confirm,
}

impl Command {
    /// Parse a slash command. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };

        match head {
            "/start" => Some(Self::Start {
                code: (!rest.is_empty()).then(|| rest.to_string()),
            }),
            "/client" => Some(Self::Client),
            "/help" => Some(Self::Help),
            "/send" => Some(Self::Send {
                text: rest.to_string(),
            }),
            "/revoke" => Some(Self::Revoke),
            "/confirm" => Some(Self::Confirm),
            _ => None,
        }
    }
}

// ── Reply texts ──────────────────────────────────────────────────────────────

const AUTHORIZED: &str = "Authorization granted.";
const REVOKE_PROMPT: &str = "Confirm revocation with /confirm.";
const REVOKED: &str = "Authorization removed.";
const NOTHING_PENDING: &str = "Nothing to confirm.";
const NOTHING_TO_REVOKE: &str = "Nothing to revoke.";
const NOTHING_TO_SEND: &str = "Nothing to send.";
const ACTION_FAILED: &str = "The request could not be completed. Try again later.";
const ADMIN_HELP: &str = "/send <text>: broadcast to all members";

// ── Router ───────────────────────────────────────────────────────────────────

/// Routes one inbound message through the gate and into the right action.
///
/// Replies to the sender are returned; broadcast deliveries go straight out
/// through the outbound channel.
pub struct CommandRouter {
    gate: Arc<AccessGate>,
    roster: Arc<RosterStore>,
    outbound: Arc<dyn Outbound>,
}

impl CommandRouter {
    pub fn new(
        gate: Arc<AccessGate>,
        roster: Arc<RosterStore>,
        outbound: Arc<dyn Outbound>,
    ) -> Self {
        Self {
            gate,
            roster,
            outbound,
        }
    }

    fn client_card(&self) -> String {
        format!(
            "Client\n\nMembers: {}\nSend /revoke to remove your authorization.",
            self.gate.member_count()
        )
    }

    pub async fn handle(&self, from: PrincipalId, text: &str) -> Vec<String> {
        let role = self.gate.classify(from);
        let Some(command) = Command::parse(text) else {
            // Free text: members may chat, strangers get the uniform denial.
            return match role {
                Role::Admin | Role::Member => Vec::new(),
                Role::Unknown => vec![DENIED_MESSAGE.into()],
            };
        };

        match command {
            Command::Start { code } => match role {
                Role::Admin | Role::Member => vec![self.client_card()],
                Role::Unknown => self.onboard(from, code.as_deref()),
            },
            Command::Client => match role {
                Role::Admin | Role::Member => vec![self.client_card()],
                Role::Unknown => vec![DENIED_MESSAGE.into()],
            },
            Command::Help => match role {
                Role::Admin => vec![ADMIN_HELP.into()],
                Role::Member | Role::Unknown => vec![DENIED_MESSAGE.into()],
            },
            Command::Send { text } => match role {
                Role::Admin => self.broadcast(&text).await,
                Role::Member | Role::Unknown => vec![DENIED_MESSAGE.into()],
            },
            Command::Revoke => match role {
                Role::Member => {
                    self.gate.request_revocation(from);
                    vec![REVOKE_PROMPT.into()]
                },
                Role::Admin => {
                    // The owner is only revocable if also on the roster.
                    if self.roster.contains(from) {
                        self.gate.request_revocation(from);
                        vec![REVOKE_PROMPT.into()]
                    } else {
                        vec![NOTHING_TO_REVOKE.into()]
                    }
                },
                Role::Unknown => vec![DENIED_MESSAGE.into()],
            },
            Command::Confirm => match role {
                Role::Admin | Role::Member => match self.gate.confirm_revocation(from) {
                    Ok(true) => vec![REVOKED.into()],
                    Ok(false) => vec![NOTHING_PENDING.into()],
                    Err(e) => {
                        warn!(from, error = %e, "revocation failed");
                        vec![ACTION_FAILED.into()]
                    },
                },
                Role::Unknown => vec![DENIED_MESSAGE.into()],
            },
        }
    }

    fn onboard(&self, from: PrincipalId, code: Option<&str>) -> Vec<String> {
        let Some(code) = code else {
            return vec![DENIED_MESSAGE.into()];
        };
        match self.gate.try_onboard(from, code) {
            Ok(true) => vec![AUTHORIZED.into(), self.client_card()],
            Ok(false) => vec![DENIED_MESSAGE.into()],
            Err(e) => {
                warn!(from, error = %e, "onboarding failed");
                vec![ACTION_FAILED.into()]
            },
        }
    }

    async fn broadcast(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![NOTHING_TO_SEND.into()];
        }
        let report = broadcast_message(&self.roster, self.outbound.as_ref(), text).await;
        vec![format!(
            "Broadcast delivered to {} of {} members.",
            report.delivered, report.attempted
        )]
    }
}

#[async_trait]
impl Inbound for CommandRouter {
    async fn handle(&self, from: PrincipalId, text: &str) -> Vec<String> {
        CommandRouter::handle(self, from, text).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::Result;

    use super::*;

    const OWNER: PrincipalId = 1;

    struct RecordingOutbound {
        fail_for: Option<PrincipalId>,
        sent: Mutex<Vec<(PrincipalId, String)>>,
    }

    impl RecordingOutbound {
        fn new(fail_for: Option<PrincipalId>) -> Arc<Self> {
            Arc::new(Self {
                fail_for,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Outbound for RecordingOutbound {
        async fn send_text(&self, to: PrincipalId, text: &str) -> Result<()> {
            if self.fail_for == Some(to) {
                anyhow::bail!("unreachable");
            }
            self.sent.lock().unwrap().push((to, text.to_string()));
            Ok(())
        }
    }

    fn router(
        dir: &tempfile::TempDir,
        outbound: Arc<RecordingOutbound>,
    ) -> (CommandRouter, Arc<RosterStore>) {
        let roster = Arc::new(RosterStore::open(dir.path().join("users.db")).unwrap());
        let gate = Arc::new(AccessGate::new(OWNER, "sesame", Arc::clone(&roster)));
        let router = CommandRouter::new(gate, Arc::clone(&roster), outbound);
        (router, roster)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("/start sesame"),
            Some(Command::Start {
                code: Some("sesame".into())
            })
        );
        assert_eq!(Command::parse("/start"), Some(Command::Start { code: None }));
        assert_eq!(Command::parse("  /client  "), Some(Command::Client));
        assert_eq!(
            Command::parse("/send hello there"),
            Some(Command::Send {
                text: "hello there".into()
            })
        );
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn onboarding_with_the_right_code() {
        let dir = tempfile::tempdir().unwrap();
        let (router, roster) = router(&dir, RecordingOutbound::new(None));

        let replies = router.handle(42, "/start sesame").await;
        assert_eq!(replies[0], AUTHORIZED);
        assert!(roster.contains(42));

        // Already a member: /start is just the status card.
        let replies = router.handle(42, "/start sesame").await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("Members: 1"));
    }

    #[tokio::test]
    async fn denials_share_one_message() {
        let dir = tempfile::tempdir().unwrap();
        let (router, roster) = router(&dir, RecordingOutbound::new(None));
        roster.add(9, None).unwrap();

        // Unknown id, wrong code, member privilege escalation: all identical.
        let unknown_text = router.handle(50, "what is this").await;
        let wrong_code = router.handle(51, "/start guess").await;
        let no_code = router.handle(52, "/start").await;
        let member_send = router.handle(9, "/send hi all").await;
        let unknown_client = router.handle(53, "/client").await;

        let denied = vec![DENIED_MESSAGE.to_string()];
        for replies in [&unknown_text, &wrong_code, &no_code, &member_send, &unknown_client] {
            assert_eq!(replies, &denied);
        }
        // And none of them became a member.
        assert_eq!(roster.len(), 1);
    }

    #[tokio::test]
    async fn admin_broadcast_reports_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let outbound = RecordingOutbound::new(Some(12));
        let (router, roster) = router(&dir, Arc::clone(&outbound));
        for id in 10..15 {
            roster.add(id, None).unwrap();
        }

        let replies = router.handle(OWNER, "/send maintenance at noon").await;
        assert_eq!(replies, vec!["Broadcast delivered to 4 of 5 members."]);

        let sent = outbound.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        assert!(sent.iter().all(|(_, text)| text == "maintenance at noon"));
    }

    #[tokio::test]
    async fn admin_send_without_text() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _roster) = router(&dir, RecordingOutbound::new(None));
        let replies = router.handle(OWNER, "/send").await;
        assert_eq!(replies, vec![NOTHING_TO_SEND.to_string()]);
    }

    #[tokio::test]
    async fn help_is_admin_only() {
        let dir = tempfile::tempdir().unwrap();
        let (router, roster) = router(&dir, RecordingOutbound::new(None));
        roster.add(5, None).unwrap();

        assert_eq!(router.handle(OWNER, "/help").await, vec![ADMIN_HELP.to_string()]);
        assert_eq!(
            router.handle(5, "/help").await,
            vec![DENIED_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn revocation_is_two_step() {
        let dir = tempfile::tempdir().unwrap();
        let (router, roster) = router(&dir, RecordingOutbound::new(None));
        roster.add(8, None).unwrap();

        // A lone confirm does nothing.
        assert_eq!(
            router.handle(8, "/confirm").await,
            vec![NOTHING_PENDING.to_string()]
        );
        assert!(roster.contains(8));

        // A lone revoke only prompts.
        assert_eq!(
            router.handle(8, "/revoke").await,
            vec![REVOKE_PROMPT.to_string()]
        );
        assert!(roster.contains(8));

        assert_eq!(router.handle(8, "/confirm").await, vec![REVOKED.to_string()]);
        assert!(!roster.contains(8));
    }

    #[tokio::test]
    async fn member_free_text_gets_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (router, roster) = router(&dir, RecordingOutbound::new(None));
        roster.add(3, None).unwrap();
        assert!(router.handle(3, "thanks!").await.is_empty());
    }
}
