use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{FuzzySelect, Input, Select, theme::ColorfulTheme};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod backend;
mod config;
mod error;
mod hls;
mod page;
mod player;
mod ranges;
mod search;
mod source;
mod types;
mod view;

use backend::http::HttpBackend;
use config::Settings;
use page::{PageAddress, WatchPage};
use player::PlayerState;
use player::mpv::MpvStack;
use search::SearchPanel;
use source::SourceSelector;
use types::{CaptionTrack, Translation};

type Page = WatchPage<HttpBackend, MpvStack>;

#[derive(Debug, Parser)]
#[command(
    name = "anwatch",
    about = "Browse anime episodes and play them through an embed or mpv.",
    version
)]
struct Cli {
    /// Watch page URL carrying `animeId` and `dataId`.
    #[arg(value_name = "WATCH_URL")]
    url: Option<String>,

    #[arg(long, value_name = "ID")]
    anime_id: Option<String>,

    #[arg(long, value_name = "ID")]
    data_id: Option<String>,

    #[arg(long)]
    dub: bool,

    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// HLS manifest to play natively once the page is loaded.
    #[arg(long, value_name = "MANIFEST")]
    stream: Option<String>,

    #[arg(long = "caption", value_name = "URL", requires = "stream")]
    captions: Vec<String>,

    /// Index into `--caption` of the track shown by default.
    #[arg(long, value_name = "INDEX", requires = "stream")]
    default_caption: Option<usize>,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Episode,
    Range,
    Translation,
    Stream,
    StopStream,
    WaitPlayer,
    Search,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let result = run().await;
    if let Err(err) = &result {
        eprintln!("error: {err:?}");
    }
    result
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.log_filter);

    let backend = Arc::new(HttpBackend::new(&settings)?);
    let translation = if cli.dub {
        Translation::Dub
    } else {
        settings.default_translation
    };

    let mut address = page_address(&cli)?;
    if let Some(query) = cli.search.as_deref() {
        let mut panel = SearchPanel::default();
        match pick_search_hit(&mut panel, backend.as_ref(), query).await? {
            Some(picked) => address = picked,
            None => {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }
    if address.is_empty() {
        println!("No anime given. Use `anwatch <watch-url>`, `--data-id <id>` or `--search <name>`.");
        return Ok(());
    }

    let selector = SourceSelector::new(&settings.embed_base_url)?;
    let stack = MpvStack::new(&settings)?;
    let mut page = WatchPage::new(Arc::clone(&backend), selector, stack, address, translation);

    println!("Loading episodes...");
    page.mount();
    page.settle().await;
    print_page(&page);

    if let Some(manifest) = cli.stream.as_deref() {
        let tracks = caption_tracks(&cli.captions, cli.default_caption);
        play_stream(&mut page, manifest, &tracks).await;
    }

    let result = browse(&mut page, backend.as_ref()).await;
    page.teardown();
    result
}

fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Watch URL first, explicit flags on top.
fn page_address(cli: &Cli) -> Result<PageAddress> {
    let from_url = match cli.url.as_deref() {
        Some(url) => PageAddress::parse(url)?,
        None => PageAddress::default(),
    };
    Ok(PageAddress::new(
        cli.anime_id.clone().or(from_url.anime_id),
        cli.data_id.clone().or(from_url.data_id),
    ))
}

fn caption_tracks(files: &[String], default: Option<usize>) -> Vec<CaptionTrack> {
    files
        .iter()
        .enumerate()
        .map(|(idx, file)| CaptionTrack::captions(file.as_str(), None, default == Some(idx)))
        .collect()
}

async fn browse(page: &mut Page, backend: &HttpBackend) -> Result<()> {
    let mut panel = SearchPanel::default();
    loop {
        println!("{}", status(page));
        let actions = actions(page);
        let labels: Vec<String> = actions
            .iter()
            .map(|action| action_label(*action, page))
            .collect();
        let selection = Select::with_theme(&theme())
            .with_prompt("What next? (Esc to quit)")
            .items(&labels)
            .default(0)
            .interact_opt()?;
        let Some(idx) = selection else {
            return Ok(());
        };

        match actions[idx] {
            Action::Episode => pick_episode(page).await?,
            Action::Range => pick_range(page)?,
            Action::Translation => {
                let next = page.translation().toggled();
                println!("Switching to {}.", next.label());
                if let Some(ticket) = page.set_translation(next) {
                    tracing::debug!(episode_id = ticket.episode_id(), "reloading in {}", next.as_str());
                }
                page.settle().await;
                println!("{}", view::server_summary(page.selection()));
            }
            Action::Stream => {
                let manifest: String = Input::with_theme(&theme())
                    .with_prompt("HLS manifest URL")
                    .interact_text()?;
                let captions: String = Input::with_theme(&theme())
                    .with_prompt("Caption URLs, space separated (first is shown)")
                    .allow_empty(true)
                    .interact_text()?;
                let files: Vec<String> = captions.split_whitespace().map(str::to_string).collect();
                let tracks = caption_tracks(&files, (!files.is_empty()).then_some(0));
                play_stream(page, manifest.trim(), &tracks).await;
            }
            Action::StopStream => {
                if let Err(err) = page.stop_stream() {
                    println!("Could not show the embed: {err}");
                }
            }
            Action::WaitPlayer => {
                println!("Waiting for the player to close...");
                if let Err(err) = page.wait_for_player().await {
                    println!("Player exited: {err}");
                }
                if let Err(err) = page.stop_stream() {
                    println!("Could not show the embed: {err}");
                }
            }
            Action::Search => {
                let query: String = Input::with_theme(&theme())
                    .with_prompt("Search")
                    .allow_empty(true)
                    .interact_text()?;
                if let Some(address) = pick_search_hit(&mut panel, backend, &query).await? {
                    println!("Loading episodes...");
                    page.navigate(address);
                    page.settle().await;
                    print_page(page);
                }
            }
            Action::Quit => return Ok(()),
        }
    }
}

fn actions(page: &Page) -> Vec<Action> {
    let mut actions = Vec::new();
    if !page.visible_episodes().is_empty() {
        actions.push(Action::Episode);
    }
    if page.ranges().len() > 1 {
        actions.push(Action::Range);
    }
    if page.selection().episode_id.is_some() {
        actions.push(Action::Translation);
    }
    actions.push(Action::Stream);
    if page.player().state() == PlayerState::StreamActive {
        actions.push(Action::WaitPlayer);
        actions.push(Action::StopStream);
    }
    actions.push(Action::Search);
    actions.push(Action::Quit);
    actions
}

fn action_label(action: Action, page: &Page) -> String {
    match action {
        Action::Episode => format!(
            "Pick episode ({})",
            page.selected_range().unwrap_or("all")
        ),
        Action::Range => String::from("Change episode range"),
        Action::Translation => format!("Switch to {}", page.translation().toggled().label()),
        Action::Stream => String::from("Play HLS stream"),
        Action::StopStream => String::from("Stop stream (back to embed)"),
        Action::WaitPlayer => String::from("Watch until the player closes"),
        Action::Search => String::from("Search anime"),
        Action::Quit => String::from("Quit"),
    }
}

async fn pick_episode(page: &mut Page) -> Result<()> {
    let active = page.selection().episode_id.clone();
    let visible = page.visible_episodes();
    let labels = view::episode_labels(visible, active.as_deref());
    let default_idx = visible
        .iter()
        .position(|ep| Some(ep.id.as_str()) == active.as_deref())
        .unwrap_or(0);
    let selection = FuzzySelect::with_theme(&theme())
        .with_prompt("Episode to watch (Esc to cancel)")
        .items(&labels)
        .default(default_idx)
        .interact_opt()?;
    let Some(idx) = selection else {
        return Ok(());
    };
    let episode_id = visible[idx].id.clone();

    page.select_episode(&episode_id);
    page.settle().await;
    println!("{}", view::server_summary(page.selection()));
    Ok(())
}

fn pick_range(page: &mut Page) -> Result<()> {
    let keys = page.ranges().keys();
    let labels = view::range_labels(page.ranges(), page.selected_range());
    let default_idx = page
        .selected_range()
        .and_then(|current| keys.iter().position(|key| key == current))
        .unwrap_or(0);
    let selection = Select::with_theme(&theme())
        .with_prompt("Episode range")
        .items(&labels)
        .default(default_idx)
        .interact_opt()?;
    if let Some(idx) = selection {
        page.select_range(&keys[idx]);
    }
    Ok(())
}

async fn play_stream(page: &mut Page, manifest: &str, tracks: &[CaptionTrack]) {
    if manifest.is_empty() {
        println!("No manifest given.");
        return;
    }
    println!("Resolving stream {manifest}...");
    match page.play_stream(manifest, tracks).await {
        Ok(()) => {
            println!("Playing in the external player.");
            if let Some(slot) = page.player().showing_caption() {
                println!("Captions: {} ({})", slot.label, slot.srclang);
            }
        }
        Err(err) if err.is_decoder_attach() => {
            println!("Could not load the stream ({err}). Showing the embed instead.");
        }
        Err(err) => println!("Could not start the player: {err}"),
    }
}

/// Runs a search and lets the user pick a hit. Cancelling the list closes
/// the results panel.
async fn pick_search_hit(
    panel: &mut SearchPanel,
    backend: &HttpBackend,
    query: &str,
) -> Result<Option<PageAddress>> {
    panel.search(backend, query).await;
    if !panel.is_visible() {
        if !query.trim().is_empty() {
            println!("No results for \"{}\".", query.trim());
        }
        return Ok(None);
    }

    let labels: Vec<&str> = panel.results().iter().map(|hit| hit.title.as_str()).collect();
    let selection = Select::with_theme(&theme())
        .with_prompt("Select an anime (Esc to cancel)")
        .items(&labels)
        .default(0)
        .interact_opt()?;
    let Some(idx) = selection else {
        panel.on_pointer_down(false);
        return Ok(None);
    };
    let hit = &panel.results()[idx];
    let address = PageAddress::new(Some(hit.id.clone()), hit.data_id());
    if address.data_id.is_none() {
        println!("\"{}\" has no episode list id; only its details will load.", hit.title);
    }
    panel.on_pointer_down(false);
    Ok(Some(address))
}

fn print_page(page: &Page) {
    tracing::debug!(address = ?page.address(), "page loaded");
    for line in view::header(page.anime()) {
        println!("{line}");
    }
    if page.ranges().is_empty() {
        println!("No episodes found.");
        return;
    }
    println!(
        "Found {} episodes in {} ranges.",
        page.episodes().len(),
        page.ranges().len()
    );
    println!("{}", view::server_summary(page.selection()));
}

fn status(page: &Page) -> String {
    view::status_line(
        page.source().as_ref(),
        page.selected_episode(),
        page.translation(),
    )
}

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}
