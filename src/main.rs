use chat_relay::{api, config::RelayConfig, Relay};
use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = RelayConfig::parse();
    let addr = match config.bind_addr().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Keep track of all connections and the rooms they are in
    let relay = Relay::new(config.routing_policy());
    let routes = api::build_filters(relay, config.wire_format);

    info!("chat relay listening on ws://{}/chat", addr);
    warp::serve(routes).run(addr).await;
}
