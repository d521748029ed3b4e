use movieapp_core::{ClientConfig, MovieFetcher, TmdbFetcher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = TmdbFetcher::with_config(ClientConfig::from_env())?;

    let queries = ["The Matrix", "Spirited Away", "Parasite", "   "];

    for query in queries {
        println!("\n{}", "=".repeat(60));
        println!("Searching: {:?}", query);
        println!("{}\n", "=".repeat(60));

        let results = fetcher.search(query).await?;
        if results.is_empty() {
            println!("No results");
            continue;
        }

        for movie in results.iter().take(5) {
            println!(
                "  {} - {} ({})",
                movie.id,
                movie.title.as_deref().unwrap_or("?"),
                movie.release_year().unwrap_or("?")
            );
        }
        println!("\n{} results in total.", results.len());
    }

    Ok(())
}
