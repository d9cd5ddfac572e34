use app::App;
use miette::Result;
use rishta_server::app;

#[tokio::main]
async fn main() -> Result<()> {
    App::new().run().await
}
