use std::sync::Arc;

use anyhow::{Context, Result};
use client_core::{CatalogCoordinator, CatalogEvent, Completion};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{broadcast::error::RecvError, oneshot},
    task::JoinSet,
};

use crate::render;

pub const BROWSE_HELP: &str =
    "commands: c <category> | s <query> | clear | next | prev | page <n> | refresh | categories | quit";

/// Interactive catalog loop. Returns once the input ends and every issued
/// request has completed and been printed.
pub async fn browse<R>(coordinator: Arc<CatalogCoordinator>, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (stop_tx, stop_rx) = oneshot::channel();
    let printer = tokio::spawn(print_events(coordinator.subscribe_events(), stop_rx));

    let mut dispatches: JoinSet<Completion> = JoinSet::new();
    dispatches.spawn(coordinator.refresh());
    coordinator.load_bootstrap().await;
    println!("{BROWSE_HELP}");

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((line, ""));

        let dispatch = match command {
            "" => continue,
            "q" | "quit" | "exit" => break,
            "c" | "category" => coordinator.select_category(arg),
            "s" | "search" => coordinator.search(arg),
            "clear" => coordinator.clear_filters(),
            "n" | "next" => coordinator.next_page(),
            "p" | "prev" => coordinator.previous_page(),
            "page" => match arg.parse::<u32>() {
                Ok(page) => coordinator.go_to_page(page),
                Err(_) => {
                    eprintln!("page expects a number");
                    continue;
                }
            },
            "r" | "refresh" => coordinator.refresh(),
            "categories" => {
                println!("{}", render::category_list(&coordinator.snapshot().categories));
                continue;
            }
            _ => {
                println!("{BROWSE_HELP}");
                continue;
            }
        };
        dispatches.spawn(dispatch);
    }

    while let Some(joined) = dispatches.join_next().await {
        joined.context("catalog request task failed")?;
    }
    let _ = stop_tx.send(());
    printer.await.context("event printer failed")?;
    Ok(())
}

async fn print_events(
    mut events: tokio::sync::broadcast::Receiver<CatalogEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            },
            _ = &mut stop => {
                while let Ok(event) = events.try_recv() {
                    print_event(event);
                }
                return;
            }
        }
    }
}

fn print_event(event: CatalogEvent) {
    match event {
        CatalogEvent::ResultsApplied(snapshot) => {
            print!("{}", render::catalog_page(&snapshot));
        }
        CatalogEvent::RequestFailed { message, .. } => {
            eprintln!("request failed: {message}");
        }
        CatalogEvent::FeaturedLoaded(featured) if !featured.is_empty() => {
            println!("Featured:");
            for product in &featured {
                println!("  {}", render::product_line(product));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "tests/browse_tests.rs"]
mod tests;
