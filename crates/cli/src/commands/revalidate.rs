//! `revalidate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use contracts::{EntityKind, EntityRef};

use super::{report_dispatched, report_enqueued};
use crate::cli::RevalidateCommand;
use crate::pipeline::Pipeline;

/// Execute the `revalidate` command
pub async fn run_revalidate(config: &Path, command: &RevalidateCommand) -> Result<()> {
    let pipeline = Pipeline::load(config)?;
    let service = &pipeline.service;

    match command {
        RevalidateCommand::Tag {
            tag,
            domain,
            target,
            queue,
        } => {
            info!(tag = %tag, domain = %domain, queued = *queue, "Revalidating tag");
            let selector = target.selector();
            if *queue {
                report_enqueued(&service.enqueue_tag(&selector, tag, domain)?);
            } else {
                report_dispatched(&service.revalidate_tag(&selector, tag, domain).await?)?;
            }
        }
        RevalidateCommand::Path {
            path,
            target,
            queue,
        } => {
            info!(path = %path, queued = *queue, "Revalidating path");
            let selector = target.selector();
            if *queue {
                report_enqueued(&service.enqueue_path(&selector, path)?);
            } else {
                report_dispatched(&service.revalidate_path(&selector, path).await?)?;
            }
        }
        RevalidateCommand::Entity {
            kind,
            id,
            bundle,
            target,
            queue,
        } => {
            let kind: EntityKind = kind.parse().context("Invalid entity kind")?;
            let entity = EntityRef::new(kind, bundle.as_deref(), id);
            let tags = registry::tags_for(&entity);
            if tags.is_empty() {
                println!("No cache tags for {} {}", entity.kind, entity.id);
                return Ok(());
            }
            info!(entity = %entity.kind, id = %entity.id, tags = ?tags, "Revalidating entity");

            let selector = target.selector();
            if *queue {
                report_enqueued(&service.enqueue_entity(&selector, &entity)?);
            } else {
                report_dispatched(&service.revalidate_entity(&selector, &entity).await?)?;
            }
        }
    }

    Ok(())
}
