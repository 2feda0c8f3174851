//! Reads `mongodbatlas_stream_account_details` against a live Atlas project
//!
//! cargo run -p mongodbatlas --example stream_account_details -- <project_id> <cloud_provider> <region>

use mongodbatlas::MongoDbAtlasProvider;
use tfplug::types::{Dynamic, DynamicValue};
use tfplug::{Context, ProviderServer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(project_id), Some(cloud_provider), Some(region_name)) =
        (args.next(), args.next(), args.next())
    else {
        return Err("usage: stream_account_details <project_id> <cloud_provider> <region>".into());
    };

    // Credentials come from MONGODB_ATLAS_* environment variables
    let server = ProviderServer::new(MongoDbAtlasProvider::new());
    let provider_config = DynamicValue::new(Dynamic::object([
        ("base_url", Dynamic::Null),
        ("access_token", Dynamic::Null),
        ("client_id", Dynamic::Null),
        ("client_secret", Dynamic::Null),
        ("request_timeout_seconds", Dynamic::Null),
    ]));
    let diags = server
        .configure_provider(Context::new(), &provider_config.encode_msgpack()?)
        .await;
    if !diags.is_empty() {
        for diag in &diags {
            error!("{}: {}", diag.summary, diag.detail);
        }
        return Err("provider configuration failed".into());
    }

    let config = DynamicValue::new(Dynamic::object([
        ("project_id", Dynamic::from(project_id)),
        ("cloud_provider", Dynamic::from(cloud_provider)),
        ("region_name", Dynamic::from(region_name)),
    ]));
    let ctx = Context::new().with_timeout(std::time::Duration::from_secs(60));
    let read = server
        .read_data_source(ctx, "mongodbatlas_stream_account_details", &config.encode_msgpack()?)
        .await;

    for diag in &read.diagnostics {
        error!("{}: {}", diag.summary, diag.detail);
    }
    if read.state.is_empty() {
        return Err("no state returned".into());
    }

    let state = DynamicValue::decode_msgpack(&read.state)?;
    info!("{}", String::from_utf8_lossy(&state.encode_json()?));
    Ok(())
}
