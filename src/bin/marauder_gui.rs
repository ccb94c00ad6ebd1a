use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use marauder::client::{Identity, PersonLookup, ResolutionClient};
use marauder::config::{LocatorConfig, SamplerBackend};
use marauder::place::{Candidate, PlaceId};
use marauder::worker::{
    Dispatch, Outcome, PollingWorker, WorkerEvent, WorkerHandle, WorkerOptions, WorkerStatus,
};

#[derive(Parser, Debug)]
#[command(name = "marauder_gui")]
#[command(about = "Indoor Wi-Fi fingerprint location client - GUI", long_about = None)]
struct Args {
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(long)]
    server: Option<String>,

    #[arg(short = 'u', long)]
    user: Option<String>,

    #[arg(long)]
    replay: Option<String>,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const MAX_LOG_LINES: usize = 1000;
const REPAINT_INTERVAL: Duration = Duration::from_millis(250);

struct GuiLogger {
    tx: Sender<String>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(msg);
        }
    }

    fn flush(&self) {}
}

struct MarauderApp {
    worker: WorkerHandle,
    events: Receiver<WorkerEvent>,
    logs: Receiver<String>,
    log_lines: VecDeque<String>,
    username: String,
    map_url: String,
    status: WorkerStatus,
    candidates: Vec<Candidate>,
    /// Where we last told the service we are
    posted: Option<PlaceId>,
    last_error: Option<String>,
    person_query: String,
    person_answer: Option<String>,
    worker_stopped: bool,
}

impl MarauderApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        worker: WorkerHandle,
        events: Receiver<WorkerEvent>,
        logs: Receiver<String>,
        username: String,
        map_url: String,
    ) -> Self {
        Self {
            worker,
            events,
            logs,
            log_lines: VecDeque::new(),
            username,
            map_url,
            status: WorkerStatus::Idle,
            candidates: Vec::new(),
            posted: None,
            last_error: None,
            person_query: String::new(),
            person_answer: None,
            worker_stopped: false,
        }
    }

    fn drain_updates(&mut self) {
        while let Ok(line) = self.logs.try_recv() {
            self.log_lines.push_back(line);
            if self.log_lines.len() > MAX_LOG_LINES {
                self.log_lines.pop_front();
            }
        }

        while let Ok(event) = self.events.try_recv() {
            match event {
                WorkerEvent::Status(status) => self.status = status,
                WorkerEvent::Located(outcome) => match outcome {
                    Outcome::Completed(candidates) => {
                        self.candidates = candidates;
                        self.last_error = None;
                    }
                    Outcome::Failed(e) => self.last_error = Some(e.to_string()),
                    Outcome::Disabled => {}
                },
                WorkerEvent::Posted { place, outcome } => match outcome {
                    Outcome::Completed(_) => self.posted = Some(place),
                    Outcome::Failed(e) => self.last_error = Some(e.to_string()),
                    Outcome::Disabled => {}
                },
                WorkerEvent::Corrected { place, outcome } => {
                    if let Outcome::Failed(e) = outcome {
                        self.last_error = Some(format!("Training {} failed: {}", place, e));
                    }
                }
                WorkerEvent::PersonFound { username, outcome } => {
                    self.person_answer = Some(match outcome {
                        Outcome::Completed(PersonLookup::Found(record)) => format!(
                            "{} is at {} (since {})",
                            username,
                            record.place.readable_name(),
                            record.last_update
                        ),
                        Outcome::Completed(PersonLookup::Nobody) => {
                            format!("{} is not on the map", username)
                        }
                        Outcome::Failed(e) => format!("Lookup failed: {}", e),
                        Outcome::Disabled => "Offline".to_string(),
                    });
                }
                WorkerEvent::PlaceChecked { .. } | WorkerEvent::Cloaked { .. } => {}
                WorkerEvent::Stopped => self.worker_stopped = true,
            }
        }
    }

    fn report(&self, what: &str, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Accepted => log::debug!("{} queued", what),
            Dispatch::Coalesced => log::info!("Refresh already under way"),
            Dispatch::Rejected(_) => log::warn!("Still busy; {} not sent, try again", what),
            Dispatch::Closed => log::error!("Location worker is gone"),
        }
    }

    fn status_label(&self) -> egui::RichText {
        let (text, color) = match self.status {
            WorkerStatus::Idle => ("IDLE", egui::Color32::from_rgb(100, 255, 100)),
            WorkerStatus::Busy => ("UPDATING", egui::Color32::YELLOW),
            WorkerStatus::Offline => ("OFFLINE", egui::Color32::from_rgb(255, 80, 80)),
        };
        egui::RichText::new(text).color(color).strong()
    }

    fn draw_candidates(&mut self, ui: &mut egui::Ui) {
        let offline = self.status == WorkerStatus::Offline;
        let mut picked = None;

        egui::Grid::new("candidates")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                for candidate in &self.candidates {
                    ui.label(candidate.place.readable_name());
                    ui.label(
                        egui::RichText::new(format!("{:.1}", candidate.coordinate.distance))
                            .monospace()
                            .color(egui::Color32::LIGHT_GRAY),
                    );
                    if ui
                        .add_enabled(!offline, egui::Button::new("This is where I am"))
                        .clicked()
                    {
                        picked = Some(candidate.clone());
                    }
                    ui.end_row();
                }
            });

        if let Some(candidate) = picked {
            let dispatch = self
                .worker
                .correct(candidate.place.clone(), candidate.coordinate);
            self.report("correction", dispatch);
        }
    }
}

impl eframe::App for MarauderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        ctx.request_repaint_after(REPAINT_INTERVAL);

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status_label());
                ui.separator();
                ui.label(egui::RichText::new(&self.username).color(egui::Color32::WHITE));
                ui.separator();

                let offline = self.status == WorkerStatus::Offline;
                if ui
                    .add_enabled(!offline, egui::Button::new("Refresh"))
                    .clicked()
                {
                    let dispatch = self.worker.refresh();
                    self.report("refresh", dispatch);
                }
                if ui
                    .add_enabled(!offline, egui::Button::new("Go offline"))
                    .clicked()
                {
                    self.worker.stop_working();
                }
                ui.separator();
                ui.hyperlink_to("Open map", &self.map_url);

                if self.worker_stopped {
                    ui.separator();
                    ui.label(
                        egui::RichText::new("STOPPED")
                            .color(egui::Color32::from_rgb(255, 80, 80))
                            .strong(),
                    );
                }
            });
        });

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(150.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Log")
                            .color(egui::Color32::LIGHT_GRAY)
                            .strong(),
                    );
                    if ui.small_button("Clear").clicked() {
                        self.log_lines.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_rgb(180, 180, 180)),
                            );
                        }
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let here = self
                .candidates
                .first()
                .map(|c| c.place.readable_name())
                .unwrap_or_else(|| "Unknown".to_string());
            ui.label(egui::RichText::new("You appear to be").color(egui::Color32::LIGHT_GRAY));
            ui.heading(egui::RichText::new(here).strong());
            if let Some(posted) = &self.posted {
                ui.label(
                    egui::RichText::new(format!("Posted: {}", posted.readable_name()))
                        .color(egui::Color32::LIGHT_GRAY)
                        .small(),
                );
            }
            if let Some(error) = &self.last_error {
                ui.label(egui::RichText::new(error).color(egui::Color32::from_rgb(255, 100, 100)));
            }

            ui.add_space(8.0);
            ui.separator();
            ui.label(egui::RichText::new("Candidates").color(egui::Color32::LIGHT_GRAY));
            egui::ScrollArea::vertical()
                .max_height(300.0)
                .show(ui, |ui| self.draw_candidates(ui));

            ui.add_space(8.0);
            ui.separator();
            ui.horizontal(|ui| {
                ui.label("Find user:");
                let response = ui.text_edit_singleline(&mut self.person_query);
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if (ui.button("Look up").clicked() || submitted)
                    && !self.person_query.trim().is_empty()
                {
                    let dispatch = self.worker.query_person(self.person_query.trim());
                    self.report("lookup", dispatch);
                }
            });
            if let Some(answer) = &self.person_answer {
                ui.label(answer);
            }
        });
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let (log_tx, log_rx) = crossbeam_channel::unbounded::<String>();
    let logger = GuiLogger {
        tx: log_tx,
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = match &args.config {
        Some(path) => LocatorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LocatorConfig::default(),
    };
    if let Some(server) = args.server {
        config.service.base_url = server;
    }
    if let Some(replay) = args.replay {
        config.sampler.backend = SamplerBackend::Replay;
        config.sampler.replay_file = Some(replay);
    }
    if let Some(user) = args.user {
        config.identity.username = Some(user);
    }
    config.validate().context("Invalid configuration")?;

    let identity = Identity::discover(config.identity.username.as_deref())
        .context("Cannot determine username; pass --user or set identity.username")?;
    let username = identity.username.clone();
    let client =
        ResolutionClient::from_config(&config).context("Failed to set up location client")?;

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let worker = PollingWorker::spawn(
        client,
        identity,
        WorkerOptions::from(&config.polling),
        event_tx,
    )?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 640.0])
            .with_min_inner_size([400.0, 400.0])
            .with_title("Marauder"),
        ..Default::default()
    };

    let map_url = config.service.map_url.clone();
    eframe::run_native(
        "Marauder",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(MarauderApp::new(
                cc, worker, event_rx, log_rx, username, map_url,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
