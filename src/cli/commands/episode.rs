use crate::domain::{AnimeId, EpisodeId};
use crate::state::SharedState;

pub async fn cmd_episode(state: &SharedState, anime_id: i64, episode_id: i64) -> anyhow::Result<()> {
    if anime_id <= 0 || episode_id <= 0 {
        println!("IDs must be positive integers.");
        return Ok(());
    }

    let episode = state
        .catalog
        .episode(AnimeId::new(anime_id), EpisodeId::new(episode_id))
        .await?;

    if let Some(anime) = &episode.anime {
        println!("{} - Episode {}", anime.title, episode.episode);
    } else {
        println!("Episode {}", episode.episode);
    }
    println!("{:-<60}", "");

    for watch in episode.watches.iter().flatten() {
        println!("[{}] {:<20} {}", watch.id, watch.source, watch.stream_url);
    }

    Ok(())
}
