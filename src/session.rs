//! Interactive rename session.
//!
//! Drives a [`Batch`] through terminal prompts: pick the files, search a
//! metadata source, assign matches, review the pending renames and apply
//! them. Every prompt can be cancelled with Esc, which ends the session with
//! [`Aborted`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use dialoguer::console::{style, Term};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use reelname_common::MediaKind;
use thiserror::Error;
use tracing::debug;

use crate::batch::{Batch, PlanStatus, RenameReport, Shift};
use crate::config::LoadedConfig;
use crate::file::FileState;
use crate::probe::ToolProber;
use crate::source::{MetadataSource, ParentModel, SourceEnv, SourcePool, SourceRegistry};

/// The user cancelled a prompt.
#[derive(Debug, Error)]
#[error("Aborted!")]
pub struct Aborted;

/// Run the interactive pipeline over every file under `root`.
pub async fn run_rename(root: &Path, loaded: LoadedConfig) -> Result<()> {
    let templates = loaded
        .config
        .compile_templates()
        .context("Invalid rename template")?;
    let prober = Arc::new(ToolProber::new(loaded.config.probe.backend));
    let batch = Batch::load(root, &loaded.config.general.extensions, templates, prober)?;

    let pool = SourcePool::new(
        SourceRegistry::builtin(),
        SourceEnv {
            config: loaded.config,
            config_path: loaded.path,
        },
    );

    Session::new(batch, pool).run().await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Match,
    Clear,
    Swap,
    Move,
    Retry,
    Remove,
    Rename,
    Finish,
    Quit,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Action::Match => "Match files",
            Action::Clear => "Clear a match",
            Action::Swap => "Swap two matches",
            Action::Move => "Move a file up or down",
            Action::Retry => "Retry media analysis",
            Action::Remove => "Remove a file from the batch",
            Action::Rename => "Review and rename",
            Action::Finish => "Finish and leave the remaining files",
            Action::Quit => "Quit",
        }
    }

    /// Actions that make sense for the current batch, in menu order.
    fn available(batch: &Batch) -> Vec<Action> {
        let mut actions = vec![Action::Match];
        if batch.unmatched().len() < batch.len() {
            actions.push(Action::Clear);
        }
        if batch.len() > 1 {
            actions.extend([Action::Swap, Action::Move]);
        }
        if !batch.failed().is_empty() {
            actions.push(Action::Retry);
        }
        actions.push(Action::Remove);
        if batch.has_renameable() {
            actions.push(Action::Rename);
        }
        actions.extend([Action::Finish, Action::Quit]);
        actions
    }

    /// Preselected action: rename once everything is matched, match while
    /// files are unmatched, otherwise finish.
    fn suggested(batch: &Batch) -> Action {
        if batch.has_renameable() && batch.all_matched() {
            Action::Rename
        } else if !batch.unmatched().is_empty() {
            Action::Match
        } else {
            Action::Finish
        }
    }
}

pub struct Session {
    batch: Batch,
    pool: SourcePool,
    term: Term,
}

impl Session {
    pub fn new(batch: Batch, pool: SourcePool) -> Self {
        Self {
            batch,
            pool,
            term: Term::stderr(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.pick_files()?;

        while !self.batch.is_empty() {
            self.print_batch()?;
            let actions = Action::available(&self.batch);
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            let suggested = Action::suggested(&self.batch);
            let default = actions.iter().position(|&a| a == suggested).unwrap_or(0);
            let choice = Select::new()
                .with_prompt("What next?")
                .items(&labels)
                .default(default)
                .interact_on_opt(&self.term)?
                .ok_or(Aborted)?;

            match actions[choice] {
                Action::Match => {
                    // Source errors end the step, not the session.
                    if let Err(e) = self.match_files().await {
                        if e.is::<Aborted>() {
                            return Err(e);
                        }
                        self.term
                            .write_line(&format!("{} {e:#}", style("error:").red().bold()))?;
                    }
                }
                Action::Clear => {
                    if let Some(index) = self.pick_one("Clear which match?")? {
                        self.batch.clear_match(index);
                    }
                }
                Action::Swap => self.swap()?,
                Action::Move => self.shift()?,
                Action::Retry => self.retry()?,
                Action::Remove => {
                    if let Some(index) = self.pick_one("Remove which file?")? {
                        self.batch.remove(index);
                    }
                }
                Action::Rename => self.review_and_rename().await?,
                Action::Finish => {
                    self.term.write_line(&format!(
                        "{} file(s) left unrenamed.",
                        self.batch.len()
                    ))?;
                    return Ok(());
                }
                Action::Quit => return Err(Aborted.into()),
            }
        }

        self.term.write_line("Nothing left to rename.")?;
        Ok(())
    }

    /// Let the user drop files from the batch before matching.
    fn pick_files(&mut self) -> Result<()> {
        let labels = self.file_labels();
        let defaults = vec![true; labels.len()];
        let keep = MultiSelect::new()
            .with_prompt("Files to rename (space toggles)")
            .items(&labels)
            .defaults(&defaults)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;

        for index in (0..self.batch.len()).rev() {
            if !keep.contains(&index) {
                self.batch.remove(index);
            }
        }
        Ok(())
    }

    async fn match_files(&mut self) -> Result<()> {
        let source = self.pick_source()?;

        let query: String = Input::new()
            .with_prompt(format!("Search {}", source.service()))
            .interact_text_on(&self.term)?;

        let parents = source
            .search(&query)
            .await
            .with_context(|| format!("{} search failed", source.service()))?;
        if parents.is_empty() {
            self.term.write_line("No results.")?;
            return Ok(());
        }

        let labels: Vec<String> = parents.iter().map(ParentModel::display_name).collect();
        let choice = Select::new()
            .with_prompt("Pick a result")
            .items(&labels)
            .default(0)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        let parent = &parents[choice];

        let episodes = match parent.kind {
            MediaKind::Movie => Vec::new(),
            MediaKind::Series => {
                let all = source
                    .list_episodes(parent)
                    .await
                    .with_context(|| format!("{} episode listing failed", source.service()))?;
                let labels: Vec<String> = all
                    .iter()
                    .map(|e| match &e.name {
                        Some(name) => format!("{} - {name}", e.s00e00()),
                        None => e.s00e00(),
                    })
                    .collect();
                let picked = MultiSelect::new()
                    .with_prompt("Episodes (space toggles)")
                    .items(&labels)
                    .interact_on_opt(&self.term)?
                    .ok_or(Aborted)?;
                picked.into_iter().map(|i| all[i].clone()).collect()
            }
        };
        if parent.kind == MediaKind::Series && episodes.is_empty() {
            self.term.write_line("No episodes selected.")?;
            return Ok(());
        }

        let replace = Select::new()
            .with_prompt("Assign to")
            .items(&["Unmatched files in order", "Selected files"])
            .default(0)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?
            == 1;

        let assigned = if replace {
            let selection = MultiSelect::new()
                .with_prompt("Files to replace")
                .items(&self.file_labels())
                .interact_on_opt(&self.term)?
                .ok_or(Aborted)?;
            self.batch.replace(&selection, parent, &episodes)
        } else {
            self.batch.append(parent, &episodes)
        };
        debug!(assigned, parent = %parent.display_name(), "matches assigned");
        self.term.write_line(&format!("Matched {assigned} file(s)."))?;
        Ok(())
    }

    fn pick_source(&self) -> Result<Arc<dyn MetadataSource>> {
        let descriptors = self.pool.registry().descriptors();
        let labels: Vec<String> = descriptors
            .iter()
            .map(|d| format!("{} ({})", d.service, d.kind))
            .collect();
        let choice = Select::new()
            .with_prompt("Metadata source")
            .items(&labels)
            .default(0)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        Ok(self.pool.get(descriptors[choice].id)?)
    }

    fn swap(&mut self) -> Result<()> {
        let Some(first) = self.pick_one("Swap the match of")? else {
            return Ok(());
        };
        let Some(second) = self.pick_one("with the match of")? else {
            return Ok(());
        };
        self.batch.swap_matches(first, second);
        Ok(())
    }

    fn shift(&mut self) -> Result<()> {
        let Some(index) = self.pick_one("Move which file?")? else {
            return Ok(());
        };
        let direction = Select::new()
            .with_prompt("Direction")
            .items(&["Up", "Down"])
            .default(0)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        let direction = if direction == 0 { Shift::Up } else { Shift::Down };
        if self.batch.shift(index, direction).is_none() {
            self.term.write_line("Already at the edge of the batch.")?;
        }
        Ok(())
    }

    fn retry(&mut self) -> Result<()> {
        let failed = self.batch.failed();
        let labels: Vec<String> = failed
            .iter()
            .map(|&index| self.relative(self.batch.files()[index].path()))
            .collect();
        let picked = MultiSelect::new()
            .with_prompt("Retry which files? (space toggles)")
            .items(&labels)
            .defaults(&vec![true; labels.len()])
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        for i in picked {
            self.batch.retry_analysis(failed[i]);
        }
        Ok(())
    }

    fn pick_one(&self, prompt: &str) -> Result<Option<usize>> {
        if self.batch.is_empty() {
            return Ok(None);
        }
        let choice = Select::new()
            .with_prompt(prompt)
            .items(&self.file_labels())
            .default(0)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        Ok(Some(choice))
    }

    async fn review_and_rename(&mut self) -> Result<()> {
        self.term.write_line("Resolving destinations...")?;
        let plans = self.batch.preview().await;

        let mut moves = 0;
        for plan in &plans {
            let from = self.relative(plan.source());
            let line = match &plan.status {
                PlanStatus::Move(to) => {
                    moves += 1;
                    format!("{from} {} {}", style("→").green(), self.relative(to))
                }
                PlanStatus::Unchanged => format!("{from} {}", style("(unchanged)").dim()),
                PlanStatus::Skipped(reason) => {
                    format!("{from} {}", style(format!("(skipped: {reason})")).yellow())
                }
                PlanStatus::Blocked(e) => format!("{from} {}", style(format!("({e})")).red()),
            };
            self.term.write_line(&line)?;
        }

        if moves == 0 {
            self.term.write_line("Nothing to rename yet.")?;
            return Ok(());
        }

        let confirmed = Confirm::new()
            .with_prompt(format!("Rename {moves} file(s)?"))
            .default(true)
            .interact_on_opt(&self.term)?
            .ok_or(Aborted)?;
        if !confirmed {
            return Ok(());
        }

        let report = self.batch.apply_renames().await;
        self.print_report(&report)?;
        Ok(())
    }

    fn print_batch(&self) -> Result<()> {
        self.term.write_line("")?;
        for (index, file) in self.batch.files().iter().enumerate() {
            let matched = file
                .current_match()
                .map(|m| m.label())
                .unwrap_or_else(|| "-".to_string());
            let state = file.state();
            let state = match state {
                FileState::Ready => style(state.to_string()).green(),
                FileState::AnalysisFailed => style(state.to_string()).red(),
                _ => style(state.to_string()).dim(),
            };
            self.term.write_line(&format!(
                "{:>3}  {}  {}  [{}]",
                index + 1,
                self.relative(file.path()),
                style(matched).cyan(),
                state
            ))?;
        }
        Ok(())
    }

    fn print_report(&self, report: &RenameReport) -> Result<()> {
        for (from, to) in &report.renamed {
            self.term.write_line(&format!(
                "{} {} → {}",
                style("✓").green(),
                self.relative(from),
                self.relative(to)
            ))?;
        }
        for (from, error) in &report.failed {
            self.term.write_line(&format!(
                "{} {}: {error}",
                style("✗").red(),
                self.relative(from)
            ))?;
        }
        self.term.write_line(&format!(
            "{} renamed, {} skipped, {} failed",
            report.renamed.len(),
            report.skipped.len(),
            report.failed.len()
        ))?;
        Ok(())
    }

    fn file_labels(&self) -> Vec<String> {
        self.batch
            .files()
            .iter()
            .map(|file| self.relative(file.path()))
            .collect()
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(self.batch.base_dir())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
