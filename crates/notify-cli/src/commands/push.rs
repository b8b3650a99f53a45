//! `notifyd push`: one delivery to one device token.

use anyhow::{Context, Result};
use clap::Args;
use notify_core::PushMessage;
use notify_host::adapters::push::PushRelay;
use serde_json::{Value, json};

use crate::opts::GlobalOpts;
use crate::output::print_success;
use crate::util;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Device token (ExponentPushToken[...])
    #[arg(long)]
    pub token: String,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub body: String,

    /// JSON object attached as message data
    #[arg(long)]
    pub data: Option<String>,
}

pub async fn cmd_push(opts: &GlobalOpts, args: &PushArgs) -> Result<()> {
    let data: Value = match &args.data {
        Some(raw) => serde_json::from_str(raw).context("parse --data as JSON")?,
        None => json!({}),
    };
    let mut message = PushMessage::new(&args.token, &args.title, &args.body, data);
    message.sound = Some("default".into());

    let result = util::push_relay(opts)?.deliver(message).await;
    let warnings = match (result.success, result.reason.as_deref()) {
        (false, Some(reason)) => vec![format!("push not delivered: {reason}")],
        _ => Vec::new(),
    };
    print_success(opts, serde_json::to_value(&result)?, warnings)
}
