//! Copy Generation Example
//!
//! This example asks an Ollama endpoint for promotional copy variations and
//! prints them together with the circuit breaker state.
//!
//! To run this example:
//! ```
//! OLLAMA_API_KEY=your_key OLLAMA_API_URL=http://localhost:11434 cargo run --example generate_copy
//! ```

use promo_sdk::{generation_client_from_env, GenerationRequest, LengthCategory, OfferType, Tone};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    println!("Promotional Copy Generation Example");
    println!("===================================\n");

    let client = generation_client_from_env()?;

    let request = GenerationRequest::new(
        "Acme Deploy",
        "One-click deploys and instant rollbacks for small engineering teams",
        "https://acme.example/deploy",
        OfferType::Affiliate,
    )
    .tone(Tone::Exciting)
    .length(LengthCategory::Short)
    .variations(3);

    match client.generate(&request).await {
        Ok(result) => {
            println!(
                "Request {}: {} of {} variations\n",
                result.request_id,
                result.items.len(),
                result.requested
            );
            for (i, item) in result.items.iter().enumerate() {
                println!("{}. {}", i + 1, item.headline.as_deref().unwrap_or("(no headline)"));
                println!("   {}", item.body);
                println!("   [{}]\n", item.cta);
            }
        }
        Err(e) if e.is_try_again_later() => {
            println!("Generation is temporarily unavailable, try again later: {}", e);
        }
        Err(e) => return Err(e.into()),
    }

    let metrics = client.breaker_metrics();
    println!(
        "Circuit breaker: {} (failures={}, successes={})",
        metrics.state, metrics.total_failures, metrics.total_successes
    );

    Ok(())
}
