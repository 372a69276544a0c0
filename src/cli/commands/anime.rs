use crate::domain::AnimeId;
use crate::models::Anime;
use crate::state::SharedState;
use tracing::warn;

fn field(value: Option<&String>) -> &str {
    value.map_or("?", String::as_str)
}

fn display_anime(anime: &Anime) {
    println!("Anime Info");
    println!("{:-<60}", "");
    println!("Title:    {}", anime.title);
    println!("ID:       {}", anime.id);
    println!("Slug:     {}", anime.slug);
    println!("Status:   {}", field(anime.status.as_ref()));
    println!("Score:    {}", field(anime.score.as_ref()));
    println!("Studio:   {}", field(anime.studio.as_ref()));
    println!("Season:   {}", field(anime.season.as_ref()));
    println!("Released: {}", field(anime.release_date.as_ref()));
    println!("Episodes: {}", field(anime.total_episodes.as_ref()));
    println!("Duration: {}", field(anime.duration.as_ref()));

    if let Some(genres) = &anime.genres {
        let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
        println!("Genres:   {}", names.join(", "));
    }

    if let Some(synopsis) = anime.synopsis.as_deref().filter(|s| !s.is_empty()) {
        println!();
        println!("{synopsis}");
    }

    let missing = anime.missing_fields();
    if !missing.is_empty() {
        println!();
        println!("Incomplete, missing: {}", missing.join(", "));
    }

    println!();
    println!("{:<10} {:<8} Mirrors", "Episode", "Label");
    println!("{:-<40}", "");
    for episode in &anime.episodes {
        let mirrors = episode.watches.as_ref().map_or(0, Vec::len);
        println!("{:<10} {:<8} {mirrors}", episode.id.value(), episode.episode);
    }
}

pub async fn cmd_anime_info(
    state: &SharedState,
    id: i64,
    resolve_watches: bool,
) -> anyhow::Result<()> {
    if id <= 0 {
        println!("Invalid anime ID: {id}");
        return Ok(());
    }
    let id = AnimeId::new(id);

    if resolve_watches {
        println!("Resolving streaming mirrors...");
        let report = state.catalog.resolve_watches(id).await?;
        println!(
            "Resolved {} episodes, {} failed\n",
            report.resolved.len(),
            report.failed.len()
        );
        for (episode_id, error) in &report.failed {
            warn!(%episode_id, %error, "Episode has no usable mirror");
        }
    }

    let anime = state.catalog.anime(id).await?;
    display_anime(&anime);

    Ok(())
}
