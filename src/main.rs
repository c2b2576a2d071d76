use anyhow::Result;
use darkly_ever_after::core::config::Config;
use darkly_ever_after::core::io::{is_quit, TerminalConsole};
use darkly_ever_after::services::generator::StoryGenerator;
use darkly_ever_after::services::llm;
use darkly_ever_after::services::story::StoryTeller;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // A missing .env is fine; the key may already be in the environment.
    if let Err(e) = dotenvy::dotenv() {
        log::debug!("No .env loaded: {}", e);
    }

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            return Err(e);
        }
    };

    let llm = llm::create_llm(&config)?;
    let generator = StoryGenerator::new(llm, &config.llm, config.ui.show_spinner);

    let mut teller = StoryTeller::new(TerminalConsole::new(), generator);
    match teller.run().await {
        Ok(()) => Ok(()),
        Err(e) if is_quit(&e) => {
            println!("Exiting the program. Goodbye!");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
