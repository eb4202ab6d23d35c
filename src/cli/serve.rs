use crate::api;
use crate::core::AppConfig;

pub async fn run(host: String, port: String) {
    let config = AppConfig::default();
    let addr = format!("{}:{}", host, port);
    api::serve(addr, config).await;
}
