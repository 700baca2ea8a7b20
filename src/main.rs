use byline::{App, init_logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let app = App::new().await?;
    app.run().await
}
