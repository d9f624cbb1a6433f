use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut client = turboread::BikeClient::discover().await?;
    loop {
        client.listen(Duration::from_secs(5)).await?;
        println!("{:?}", client.snapshot());
    }
}
