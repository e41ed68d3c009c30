use crate::output::{print_json, Table};
use crate::settings::Settings;
use anyhow::Context;
use clap::Args;
use smsblast_core::campaign::{CampaignReport, Marketer, SendOutcome};
use smsblast_core::config::{CampaignConfig, SenderConfig, WarnLevel};
use smsblast_core::{StateStore, TwilioTransport};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RunArgs {
    /// State file (overrides `state_file` in the config)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Campaign name
    #[arg(long)]
    pub name: Option<String>,

    /// Message body
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the message body from a file; trailing whitespace and newlines are dropped
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Sender number: E.164 (+15550001111) or a 5-6 digit short code
    #[arg(long, conflicts_with = "sender_id")]
    pub from: Option<String>,

    /// Approved alphanumeric sender ID (1-11 letters, digits or spaces)
    #[arg(long)]
    pub sender_id: Option<String>,

    /// Twilio account SID
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub account_sid: Option<String>,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Twilio API base URL
    #[arg(long, env = "TWILIO_API_BASE")]
    pub api_base: Option<String>,
}

fn read_body_file(path: &Path) -> anyhow::Result<String> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read body file {}", path.display()))?;
    Ok(body.trim_end().to_string())
}

pub fn run(settings: &Settings, args: RunArgs, json: bool) -> anyhow::Result<()> {
    // -- Flags replace their config fields, then the result is validated ------

    let mut cfg = settings.config.clone();

    if args.from.is_some() || args.sender_id.is_some() {
        cfg.sender = SenderConfig {
            mobile_number: args.from,
            alphanumeric_id: args.sender_id,
        };
    }

    let flag_body = match (args.body, args.body_file) {
        (Some(b), _) => Some(b),
        (None, Some(path)) => Some(read_body_file(&path)?),
        (None, None) => None,
    };
    let file_campaign = cfg.campaign.take();
    let name = args
        .name
        .or_else(|| file_campaign.as_ref().map(|c| c.name.clone()))
        .context("no campaign name: pass --name or set campaign.name in the config")?;
    let body = match flag_body {
        Some(b) => b,
        None => file_campaign
            .map(|c| c.body)
            .context("no message body: pass --body/--body-file or set campaign.body")?,
    };
    cfg.campaign = Some(CampaignConfig {
        name: name.clone(),
        body: body.clone(),
    });

    if args.api_base.is_some() {
        cfg.twilio.api_base = args.api_base;
    }

    let warnings = cfg.validate();
    for w in &warnings {
        if w.level == WarnLevel::Warning {
            tracing::warn!("{}", w.message);
        }
    }
    if let Some(err) = warnings.iter().find(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("invalid config: {}", err.message);
    }

    // -- Sender and credentials: fail before touching state -----------------

    let sender = cfg.sender.identity()?.context(
        "no sender identity: pass --from or --sender-id, or set sender in the config",
    )?;

    let account_sid = args
        .account_sid
        .or_else(|| cfg.twilio.account_sid.clone())
        .context("no Twilio account SID: set TWILIO_ACCOUNT_SID or twilio.account_sid")?;
    let auth_token = args
        .auth_token
        .or_else(|| cfg.twilio.auth_token.clone())
        .context("no Twilio auth token: set TWILIO_AUTH_TOKEN")?;
    let transport = TwilioTransport::new(
        account_sid,
        auth_token,
        cfg.twilio.api_base.as_deref(),
        cfg.twilio.timeout(),
    )?;

    // -- State + campaign pass -----------------------------------------------

    let state_path = settings.state_path(args.state.as_deref())?;
    let store = StateStore::load(&state_path)
        .context("failed to load state file")?
        .with_poll_interval(cfg.poll_interval());

    let mut marketer = Marketer::new(transport);
    marketer.set_sender_identity(sender);
    let campaign = marketer.create_campaign(name, &store, body)?;
    let report = campaign.run();

    store
        .stop_watching()
        .context("failed to save delivery state")?;
    let summary = store.summary();

    if json {
        #[derive(serde::Serialize)]
        struct RunOutput<'a> {
            state_file: String,
            #[serde(flatten)]
            report: &'a CampaignReport,
            remaining: usize,
        }
        return print_json(&RunOutput {
            state_file: state_path.display().to_string(),
            report: &report,
            remaining: summary.pending,
        });
    }

    print_human(&report, summary.pending);
    Ok(())
}

fn print_human(report: &CampaignReport, remaining: usize) {
    println!("Campaign: {} ({} pending)", report.name, report.total);
    if report.total == 0 {
        println!("\nNothing to send: every number is already delivered.");
        return;
    }
    println!();

    let mut table = Table::new(&["#", "NUMBER", "STATUS", "DETAIL"]);
    for r in &report.results {
        let (status, detail) = match &r.outcome {
            SendOutcome::Sent { sid } => ("sent", sid.clone()),
            SendOutcome::Rejected { reason } => ("rejected", reason.to_string()),
        };
        table.row(vec![
            r.progress.to_string(),
            r.number.clone(),
            status.to_string(),
            detail,
        ]);
    }
    table.print();

    println!(
        "\nSent {}, rejected {}. {} number(s) still pending.",
        report.sent_count(),
        report.rejected_count(),
        remaining
    );
}
