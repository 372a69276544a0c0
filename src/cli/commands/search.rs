use crate::state::SharedState;

pub async fn cmd_search_anime(state: &SharedState, query: &str) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        println!("Usage: animenya search <query>");
        return Ok(());
    }

    println!("Searching for: {query}");
    let hits = state.catalog.search(query).await?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("{:<8} Title", "ID");
    println!("{:-<60}", "");
    for hit in &hits {
        println!("{:<8} {}", hit.id.value(), hit.title);
    }

    Ok(())
}
