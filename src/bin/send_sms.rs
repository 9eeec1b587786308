// ABOUTME: Command line tool that sends one SMS through a configured provider router
// ABOUTME: Waits for the session to bind, submits, then optionally waits for the delivery receipt

//! ```bash
//! send_sms --config gateway.toml --to 15550001 --text "Hello"
//! send_sms --config gateway.toml --provider backup --to 15550001 --text "Hi" --wait 30 -d
//! ```

use argh::FromArgs;
use smpp_session::{
    GatewayConfig, InMemoryStore, MessageRecord, MessageStatus, MessageStore, OutboundSms,
    ProviderRouter, Readiness, RoutedSms, StatusUpdate, TcpConnector,
};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Send one SMS through an SMPP provider
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// path to the gateway TOML config
    #[argh(option, short = 'c')]
    config: String,

    /// provider to send through (default: the configured default provider)
    #[argh(option)]
    provider: Option<String>,

    /// destination address
    #[argh(option, short = 't')]
    to: String,

    /// source address (default: the provider's default sender)
    #[argh(option, short = 'f')]
    from: Option<String>,

    /// message text
    #[argh(option, short = 'm')]
    text: String,

    /// seconds to wait for the session to bind (default: 10)
    #[argh(option, default = "10")]
    bind_timeout: u64,

    /// seconds to wait for a delivery receipt after the submit (default: 0, don't wait)
    #[argh(option, default = "0")]
    wait: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = GatewayConfig::load(&cli_args.config)?;
    let store = Arc::new(InMemoryStore::new());
    let router = ProviderRouter::from_config(&config, TcpConnector::new(), Arc::clone(&store))?;
    let provider = router.resolve(cli_args.provider.as_deref())?.name().to_string();

    router.start();

    let deadline = Instant::now() + Duration::from_secs(cli_args.bind_timeout);
    while router.is_ready(Some(&provider)) != Readiness::Provider(true) {
        if Instant::now() >= deadline {
            error!(%provider, "session did not bind within {}s", cli_args.bind_timeout);
            router.stop();
            return Err(format!("provider '{provider}' not ready").into());
        }
        sleep(Duration::from_millis(100)).await;
    }

    let internal_id = format!("cli-{}", std::process::id());
    let mut record = MessageRecord::pending(&internal_id, &provider, &cli_args.to, &cli_args.text);
    record.from = cli_args.from.clone();
    store.insert(record).await?;

    let mut sms = OutboundSms::new(cli_args.to, cli_args.text);
    if let Some(from) = cli_args.from {
        sms = sms.with_from(from);
    }

    let message_id = match router.send_sms(RoutedSms::new(sms).via(&provider)).await {
        Ok(message_id) => message_id,
        Err(e) => {
            error!(%provider, code = %e.code(), "send failed: {e}");
            store
                .update_by_internal_id(
                    &internal_id,
                    StatusUpdate::new(MessageStatus::Failed).with_error(e.code()),
                )
                .await?;
            router.stop();
            return Err(e.into());
        }
    };
    info!(%provider, %message_id, "message accepted");
    store
        .update_by_internal_id(
            &internal_id,
            StatusUpdate::new(MessageStatus::Submitted).with_provider_message_id(&message_id),
        )
        .await?;

    if cli_args.wait > 0 {
        let deadline = Instant::now() + Duration::from_secs(cli_args.wait);
        loop {
            let status = store.get(&internal_id).map(|record| record.status);
            if !matches!(status, Some(MessageStatus::Submitted)) {
                info!(%message_id, ?status, "delivery receipt received");
                break;
            }
            if Instant::now() >= deadline {
                warn!(%message_id, "no delivery receipt within {}s", cli_args.wait);
                break;
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    router.stop();
    Ok(())
}
