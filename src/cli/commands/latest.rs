use crate::state::SharedState;

pub async fn cmd_latest(state: &SharedState, page: Option<u32>) -> anyhow::Result<()> {
    let episodes = state.catalog.latest(page).await?;

    if episodes.is_empty() {
        println!("No episodes in the feed.");
        return Ok(());
    }

    println!("{:<10} {:<8} {:<8} Title", "Episode", "Anime", "Label");
    println!("{:-<70}", "");

    for episode in &episodes {
        let (anime_id, title) = episode
            .anime
            .as_ref()
            .map_or((0, "?"), |a| (a.id.value(), a.title.as_str()));
        let published = episode
            .created_at
            .map(|d| d.format(" (%Y-%m-%d)").to_string())
            .unwrap_or_default();

        println!(
            "{:<10} {:<8} {:<8} {title}{published}",
            episode.id.value(),
            anime_id,
            episode.episode
        );
    }

    Ok(())
}
