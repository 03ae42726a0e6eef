use mango_dex::requests::manga::MangaFeedQuery;
use mango_dex::{ChapterFilter, ClientConfig, MangoClient};

use tokio_stream::StreamExt as _;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

const LOG_FILE: &str = "mango-dex.log";

#[tokio::main]
async fn main() -> mango_dex::Result<()> {
    let log_file = std::fs::File::create(LOG_FILE)?;
    let (writer, _guard) = tracing_appender::non_blocking(log_file);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(writer).compact())
        .with(filter)
        .init();

    let title = std::env::args().nth(1).unwrap_or_else(|| "Chainsaw Man".to_owned());
    let language = std::env::args().nth(2).unwrap_or_else(|| "en".to_owned());

    let client = MangoClient::with_config(ClientConfig::from_env())?;
    client.ping().await?;

    let found = client.search_manga_by_name(&title)?.into_stream().take(5);
    tokio::pin!(found);

    let mut first = None;
    while let Some(manga) = found.next().await {
        let manga = manga?;
        println!("{}  {}", manga.id, manga.title(&language));
        first.get_or_insert(manga);
    }

    let Some(manga) = first else {
        println!("nothing found for {title:?}");
        return Ok(());
    };

    let query = MangaFeedQuery::builder()
        .translated_language(vec![language.clone()])
        .build();
    let chapters = client.manga_chapters(&manga.id, &query).await?;

    let filter = ChapterFilter::builder()
        .has_number(true)
        .remove_duplicates(true)
        .build();
    let mut chapters = chapters.filter(&filter)?;
    chapters.sort(false);

    println!(
        "\n{}: {} chapters in {language}",
        manga.title(&language),
        chapters.len()
    );
    for chapter in chapters.iter() {
        println!("  {}", chapter.name());
    }

    Ok(())
}
