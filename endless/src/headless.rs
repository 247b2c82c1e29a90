//! Line-mode player.
//!
//! Protocol:
//! - Each view is printed as a block ending with numbered actions
//! - A number picks that action
//! - Lines starting with `#` are commands (lang, delete, title, status, help, quit)

use endless_core::{
    DirectorySource, FileSaveStore, GameSession, Intent, Lang, SessionConfig, ViewModel,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const DATA_DIR_ENV: &str = "ENDLESS_DATA_DIR";
const SAVE_DIR_ENV: &str = "ENDLESS_SAVE_DIR";

/// Settings for the terminal player.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub data_dir: PathBuf,
    pub save_dir: PathBuf,
    pub lang: Option<Lang>,
    pub name: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var_os(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            save_dir: std::env::var_os(SAVE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("saves")),
            lang: None,
            name: None,
        }
    }
}

type Session = GameSession<DirectorySource, FileSaveStore>;

/// Run the game until stdin closes or `#quit`.
pub async fn run_headless(config: PlayerConfig) -> io::Result<()> {
    let mut session_config = SessionConfig::new();
    if let Some(name) = &config.name {
        session_config = session_config.with_player_name(name);
    }
    if let Some(lang) = config.lang {
        session_config = session_config.with_default_lang(lang);
    }

    tracing::info!(data = %config.data_dir.display(), saves = %config.save_dir.display(), "starting");
    let mut session: Session = GameSession::start(
        session_config,
        DirectorySource::new(&config.data_dir),
        FileSaveStore::new(&config.save_dir),
    )
    .await;

    let mut view = match config.lang {
        Some(lang) if lang != session.lang() => {
            session.apply(Intent::SelectLanguage { lang }).await
        }
        _ => session.view(),
    };

    println!("=== Endless Advanture ===");
    println!("Type a number to act, or #help for commands.");
    println!();
    print_view(&view);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            let parts: Vec<&str> = command.split_whitespace().collect();
            match parts.first().copied() {
                Some("quit") | Some("exit") => {
                    println!("Goodbye!");
                    break;
                }
                Some("lang") => {
                    let lang = match parts.get(1) {
                        Some(code) => match code.parse::<Lang>() {
                            Ok(lang) => lang,
                            Err(e) => {
                                println!("[ERROR] {e}");
                                continue;
                            }
                        },
                        None => session.lang().toggled(),
                    };
                    view = session.apply(Intent::SelectLanguage { lang }).await;
                    print_view(&view);
                }
                Some("delete") => {
                    view = session.apply(Intent::DeleteSave).await;
                    print_view(&view);
                }
                Some("title") => {
                    view = session.apply(Intent::ReturnToTitle).await;
                    print_view(&view);
                }
                Some("status") => print_status(&session),
                Some("help") => print_commands(),
                _ => println!("[ERROR] Unknown command. Type #help for help."),
            }
            stdout.flush().ok();
            continue;
        }

        let picked = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| view.actions.get(i))
            .map(|action| action.intent.clone());
        match picked {
            Some(intent) => {
                view = session.apply(intent).await;
                print_view(&view);
            }
            None => println!("[ERROR] Pick a number from 1 to {}.", view.actions.len()),
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn print_view(view: &ViewModel) {
    println!("=== {} ===", view.title);
    if !view.subtitle.is_empty() {
        println!("({})", view.subtitle);
    }
    if let Some(hud) = &view.hud {
        println!(
            "[HUD] {} ({}) Lv{}  HP {}/{}  MP {}/{}  ATK {}  DEF {}  Gold {}  EXP {}",
            hud.name,
            hud.class_label,
            hud.level,
            hud.hp,
            hud.max_hp,
            hud.mp,
            hud.max_mp,
            hud.atk,
            hud.def,
            hud.gold,
            hud.exp
        );
    }
    println!();
    for para in view.body.split("\n\n") {
        println!("{para}");
    }
    if let Some(enemy) = &view.enemy {
        println!();
        println!("[ENEMY] {}  HP {}/{}", enemy.name, enemy.hp, enemy.max_hp);
    }
    if !view.combat_log.is_empty() {
        println!("[LOG]");
        for line in &view.combat_log {
            println!("  {line}");
        }
    }
    if let Some(notice) = &view.notice {
        println!("[NOTICE] {notice}");
    }
    println!();
    for (i, action) in view.actions.iter().enumerate() {
        println!("  {}) {}", i + 1, action.label);
    }
    println!();
}

fn print_status(session: &Session) {
    let state = session.state();
    println!("[STATUS]");
    println!("  Language: {}", session.lang());
    println!("  Mode: {:?}", state.mode);
    println!("  Episode: {}  Node: {}", state.episode_id, state.node_id);
    if let Some(player) = session.player() {
        println!("  Player: {} ({})", player.name, player.class_id);
        for (item, qty) in player.inventory.iter() {
            println!("    {item} x{qty}");
        }
    }
    if let Some(combat) = session.combat() {
        println!("  Combat round: {}", combat.round);
    }
}

fn print_commands() {
    println!("[HELP]");
    println!("  <number>         - Pick an action");
    println!("  #lang [id|en]    - Switch language");
    println!("  #delete          - Delete the save");
    println!("  #title           - Back to the title screen");
    println!("  #status          - Show session status");
    println!("  #help            - Show this help");
    println!("  #quit            - Exit the game");
}

/// Parse player configuration from command line arguments.
pub fn parse_config_from_args(args: &[String]) -> PlayerConfig {
    let mut config = PlayerConfig::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                if let Some(dir) = args.get(i + 1) {
                    config.data_dir = PathBuf::from(dir);
                    i += 1;
                }
            }
            "--save-dir" => {
                if let Some(dir) = args.get(i + 1) {
                    config.save_dir = PathBuf::from(dir);
                    i += 1;
                }
            }
            "--lang" => {
                if let Some(code) = args.get(i + 1) {
                    match code.parse() {
                        Ok(lang) => config.lang = Some(lang),
                        Err(e) => tracing::warn!("ignoring --lang: {e}"),
                    }
                    i += 1;
                }
            }
            "--name" => {
                if let Some(name) = args.get(i + 1) {
                    config.name = Some(name.clone());
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let config = parse_config_from_args(&args(&[
            "endless", "--data", "content", "--save-dir", "/tmp/s", "--lang", "en", "--name", "Ayu",
        ]));
        assert_eq!(config.data_dir, PathBuf::from("content"));
        assert_eq!(config.save_dir, PathBuf::from("/tmp/s"));
        assert_eq!(config.lang, Some(Lang::En));
        assert_eq!(config.name.as_deref(), Some("Ayu"));
    }

    #[test]
    fn test_bad_lang_is_ignored() {
        let config = parse_config_from_args(&args(&["endless", "--lang", "fr"]));
        assert_eq!(config.lang, None);
    }
}
