// UI layer: an interactive menu built with `dialoguer`.
// Each upload action picks a file, shows it in the "original" pane right
// away, then uploads it on a worker thread while a spinner runs. The menu
// is not shown again until the request has resolved, so the two upload
// actions can never overlap from here.

use crate::api::{ApiClient, Variant};
use crate::config::{Config, SUPPORTED_IMAGE_EXTENSIONS};
use crate::handle::{HandleStore, ImageHandle};
use crate::view::{Completion, ViewController};
use anyhow::{anyhow, Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Action {
    Upload(Variant),
    Clear,
    SetServer,
    Exit,
}

/// Main interactive menu. Runs until the user chooses "Exit"; the handle
/// directory is cleaned up when the view goes out of scope.
pub fn main_menu(mut api: ApiClient, mut config: Config) -> Result<()> {
    let store = HandleStore::new().context("Failed to create image handle directory")?;
    let mut view = ViewController::new(store).with_upload_limit(config.max_upload_bytes);

    loop {
        render_panes(&view);

        let actions = available_actions(&view);
        let labels: Vec<String> = actions.iter().map(|a| action_label(*a, &api)).collect();
        let selection = Select::new().items(&labels).default(0).interact()?;
        match actions[selection] {
            Action::Upload(variant) => handle_upload(&mut view, &api, variant)?,
            Action::Clear => view.clear(),
            Action::SetServer => api = handle_set_server(&mut config)?,
            Action::Exit => break,
        }
    }
    Ok(())
}

/// Upload actions are only offered while nothing is in flight.
fn available_actions(view: &ViewController) -> Vec<Action> {
    let mut actions = Vec::new();
    if !view.is_in_flight() {
        actions.extend(Variant::ALL.iter().map(|v| Action::Upload(*v)));
    }
    if view.original().is_some() || view.processed().is_some() {
        actions.push(Action::Clear);
    }
    actions.push(Action::SetServer);
    actions.push(Action::Exit);
    actions
}

fn action_label(action: Action, api: &ApiClient) -> String {
    match action {
        Action::Upload(variant) => format!("{} ...", variant.label()),
        Action::Clear => "Clear panes".into(),
        Action::SetServer => format!("Server address ({})", api.base_url()),
        Action::Exit => "Exit".into(),
    }
}

/// Pick a file, then run the request with a spinner.
fn handle_upload(view: &mut ViewController, api: &ApiClient, variant: Variant) -> Result<()> {
    let file = pick_file()?;
    let request = match view.select(file.as_deref(), variant) {
        Ok(Some(request)) => request,
        // dialog cancelled
        Ok(None) => return Ok(()),
        Err(e) => {
            println!("{} {}", "Cannot use that file:".red(), e);
            return Ok(());
        }
    };
    if let Some(original) = view.original() {
        println!("{} {}", "Original:".bold(), describe(original));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("{} ...", variant.label()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let store = view.store().clone();
    let result = thread::scope(|s| s.spawn(|| request.execute(api, &store)).join())
        .map_err(|_| anyhow!("upload worker panicked"))?;
    spinner.finish_and_clear();

    match view.complete(request.token, result) {
        Completion::Displayed => println!("{}", "Done.".green()),
        Completion::Failed(e) => println!("{} {}", "Processing failed:".red(), e),
        Completion::Superseded => {}
    }
    Ok(())
}

/// Ask for an image either through the native dialog or as a typed path.
/// `None` means the user backed out.
fn pick_file() -> Result<Option<PathBuf>> {
    let choices = ["Browse...", "Type a path", "Cancel"];
    let selection = Select::new()
        .with_prompt("Choose an image")
        .items(&choices)
        .default(0)
        .interact()?;
    match selection {
        0 => Ok(rfd::FileDialog::new()
            .add_filter("Images", &SUPPORTED_IMAGE_EXTENSIONS[..])
            .pick_file()),
        1 => {
            let path: String = Input::new()
                .with_prompt("Image file path")
                .allow_empty(true)
                .interact_text()?;
            let path = path.trim();
            Ok((!path.is_empty()).then(|| PathBuf::from(path)))
        }
        _ => Ok(None),
    }
}

/// Prompt for a new base URL, optionally persist it, and rebuild the client.
fn handle_set_server(config: &mut Config) -> Result<ApiClient> {
    let url: String = Input::new()
        .with_prompt("Service base URL")
        .default(config.base_url.clone())
        .interact_text()?;
    config.set_base_url(&url);
    let api = ApiClient::from_config(config).context("Failed to build HTTP client")?;

    if Confirm::new().with_prompt("Save as default?").interact()? {
        let path = config.save().context("Failed to save configuration")?;
        println!("Saved to {}", path.display());
    }
    Ok(api)
}

/// Print both panes, one per line.
fn render_panes(view: &ViewController) {
    println!();
    for (title, handle) in [("Original ", view.original()), ("Processed", view.processed())] {
        let body = handle.map(describe).unwrap_or_else(|| "(empty)".dim().to_string());
        println!("{}  {}", title.bold(), body);
    }
    println!();
}

fn describe(handle: &ImageHandle) -> String {
    let (w, h) = handle.dimensions();
    let format = handle
        .format()
        .extensions_str()
        .first()
        .map(|e| e.to_uppercase())
        .unwrap_or_default();
    format!("{} {}x{}, {} bytes  {}", format, w, h, handle.byte_len(), handle.url())
}
