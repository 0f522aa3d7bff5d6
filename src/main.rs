#[tokio::main]
async fn main() -> anyhow::Result<()> {
    local_pulse_lib::run().await
}
