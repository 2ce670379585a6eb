use {anyhow::bail, async_trait::async_trait, tracing::debug};

use crate::{ExecOpts, ProbeSource, exec_command};

/// fastfetch sections for the composite report, in display order.
const FASTFETCH_STRUCTURE: &str = "separator:os:separator:host:kernel:uptime:packages:shell:de:wm:wmtheme:theme:icons:font:cpu:gpu:memory:disk:localip";

/// vnstat views appended after the fastfetch block.
const VNSTAT_VIEWS: &[&[&str]] = &[&[], &["-h"], &["-hg"], &["-5"]];

/// Composite human-readable system/network report.
///
/// Concatenates a fastfetch summary with several vnstat text tables. A tool
/// that is missing or fails contributes nothing; the report is whatever the
/// remaining tools produced.
pub struct SystemReportSource {
    opts: ExecOpts,
}

impl SystemReportSource {
    pub fn new(opts: ExecOpts) -> Self {
        Self { opts }
    }
}

#[async_trait]
impl ProbeSource for SystemReportSource {
    async fn collect(&self) -> anyhow::Result<String> {
        let mut report = String::new();

        match exec_command(
            "fastfetch",
            &["--pipe", "--structure", FASTFETCH_STRUCTURE],
            &self.opts,
        )
        .await
        {
            Ok(out) => report.push_str(&scrub_cursor_escapes(&out)),
            Err(e) => debug!(error = %e, "fastfetch unavailable"),
        }

        for args in VNSTAT_VIEWS {
            match exec_command("vnstat", args, &self.opts).await {
                Ok(out) => report.push_str(&out),
                Err(e) => debug!(error = %e, "vnstat view unavailable"),
            }
        }

        if report.trim().is_empty() {
            bail!("no system probe produced output");
        }
        Ok(report)
    }
}

/// Strip ANSI cursor-forward sequences (`ESC [ <n> C`) that fastfetch leaves
/// in piped output.
pub fn scrub_cursor_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            let mut look = chars.clone();
            look.next(); // '['
            let mut digits = 0usize;
            while look.peek().is_some_and(char::is_ascii_digit) {
                look.next();
                digits += 1;
            }
            if digits > 0 && look.peek() == Some(&'C') {
                look.next();
                chars = look;
                continue;
            }
        }
        out.push(c);
    }

    out
}
