use std::sync::Arc;

use futures::StreamExt;
use movieapp_core::paging::{CategoryPageSource, PagingConfig, PagingEngine};
use movieapp_core::{load_sections, Category, ClientConfig, TmdbFetcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = Arc::new(TmdbFetcher::with_config(ClientConfig::from_env())?);

    println!("Home sections\n");
    for section in load_sections(fetcher.as_ref()).await {
        match &section.error {
            Some(error) => println!("  {}: {}", section.title, error),
            None => println!("  {}: {} movies", section.title, section.movies.len()),
        }
    }

    println!("\nPaging {} (3 pages)\n", Category::Popular.title());

    let source = Arc::new(CategoryPageSource::new(fetcher, Category::Popular));
    let engine = PagingEngine::new(source, PagingConfig::default());
    let mut stream = Box::pin(engine.stream());
    let mut requested = 1;

    while let Some(snapshot) = stream.next().await {
        let states = &snapshot.load_states;
        if let Some((direction, error)) = states.first_error() {
            println!("  {:?} failed: {}", direction, error.user_message());
            break;
        }
        if states.refresh.is_loading() || states.append.is_loading() {
            continue;
        }

        println!("  {} movies loaded", snapshot.items.len());
        if states.append.end_of_pagination_reached() || requested == 3 {
            break;
        }
        if engine.request_more() {
            requested += 1;
        }
    }

    for (i, movie) in engine.snapshot().items.iter().take(10).enumerate() {
        let vote = movie
            .vote_average
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {} ({}) [{}]",
            i + 1,
            movie.title.as_deref().unwrap_or("?"),
            movie.release_year().unwrap_or("?"),
            vote
        );
    }

    Ok(())
}
