use clap::Subcommand;

use waypost_roster::RosterStore;

#[derive(Subcommand)]
pub enum RosterAction {
    /// List authorized principal ids.
    List,
    /// Authorize a principal by id.
    Add {
        id: i64,
    },
    /// Revoke a principal by id.
    Remove {
        id: i64,
    },
}

/// Operate on the same roster file the gateway uses. Run while the gateway
/// is stopped; there is no cross-process lock.
pub fn handle_roster(action: RosterAction) -> anyhow::Result<()> {
    let mut config = waypost_config::discover_and_load();
    config.channel.apply_env_overrides();
    let store = RosterStore::open(config.channel.roster_path())?;

    match action {
        RosterAction::List => {
            let mut ids = store.snapshot();
            ids.sort_unstable();
            for id in &ids {
                println!("{id}");
            }
            println!("{} member(s)", ids.len());
        },
        RosterAction::Add { id } => {
            if store.add(id, None)? {
                println!("added {id}");
            } else {
                println!("{id} is already a member");
            }
        },
        RosterAction::Remove { id } => {
            if store.remove(id)? {
                println!("removed {id}");
            } else {
                println!("{id} is not a member");
            }
        },
    }

    Ok(())
}
