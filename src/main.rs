//! hush
//!
//! A small stacking X11 window manager: groups, keyboard cycling and an
//! incremental window search menu.

mod config;
mod shared;
mod wm;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use config::Config;
use wm::display::Display as _;
use wm::ewmh::Atoms;
use wm::keyboard::KeyboardManager;
use wm::screen::Screen;
use wm::x11::{self, X11Display, X11Menu};
use wm::{WindowManager, WmSettings};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Replace a running window manager
    #[arg(long)]
    replace: bool,

    /// Configuration file (default: ~/.config/hush/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hush=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting hush");

    let config = Config::load(args.config.as_deref())?;

    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
    let conn = Rc::new(conn);
    let atoms = Atoms::new(conn.as_ref())?;
    x11::acquire_wm_selection(&conn, screen_num, &atoms, args.replace)?;

    let (root, width, height) = {
        let screen = &conn.setup().roots[screen_num];
        (
            screen.root,
            i32::from(screen.width_in_pixels),
            i32::from(screen.height_in_pixels),
        )
    };
    let mut screen = Screen::new(0, root, width, height);
    screen.gap = config.window_manager.gap;
    screen.set_monitors(x11::query_monitors(&conn, root));

    let display = X11Display::new(Rc::clone(&conn), atoms)?;
    let keys = KeyboardManager::new(&config.keybindings);
    x11::grab_keys(&conn, root, &keys, display.keymap())?;
    let mut menu = X11Menu::new(Rc::clone(&conn), screen_num, &config, display.keymap().clone())?;

    let mut wm = WindowManager::new(display, WmSettings::from(&config), vec![screen]);

    wm.display.grab_server()?;
    let existing = wm.display.existing_windows(root);
    if let Ok(windows) = &existing {
        for &(window, mapped) in windows {
            if let Err(e) = wm.manage_window(window, 0, mapped) {
                warn!("Failed to manage existing window 0x{:x}: {:#}", window, e);
            }
        }
    }
    wm.display.ungrab_server()?;
    existing.context("Failed to list existing windows")?;
    info!("Managing {} window(s)", wm.clients.len());

    loop {
        wm.display.flush()?;
        let event = match menu.take_deferred() {
            Some(event) => event,
            None => conn.wait_for_event().context("Lost connection to X server")?,
        };

        if let Event::MappingNotify(_) = event {
            wm.display.reload_keymap()?;
            menu.set_keymap(wm.display.keymap().clone());
            x11::grab_keys(&conn, root, &keys, wm.display.keymap())?;
            continue;
        }

        let Some(wm_event) = wm.display.translate(&event) else {
            continue;
        };
        debug!("{:?}", wm_event);
        if let Err(e) = wm.handle_event(wm_event, &keys, &mut menu) {
            warn!("Failed to handle event: {:#}", e);
        }
    }
}
