mod catalog;
mod init;
mod resolve;

pub use catalog::{cmd_anime_info, cmd_episode, cmd_links};
pub use init::cmd_init;
pub use resolve::cmd_resolve;

use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
