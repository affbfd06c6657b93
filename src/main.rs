#[cfg(feature = "gui")]
use clap::Parser;
#[cfg(feature = "gui")]
use eframe::egui;
#[cfg(feature = "gui")]
use std::path::PathBuf;
#[cfg(feature = "gui")]
use std::sync::Arc;

#[cfg(feature = "gui")]
use pianoroll::{
    midi_note_name, AudioOutput, EditorConfig, FrameCanvas, GridGeometry, MidiOutputDevice,
    NotePlayer, NoteStyle, PianoRoll, SharedFrame, SharedPianoRoll, Transport, TransportHandle,
};

#[cfg(feature = "gui")]
#[derive(Parser, Debug)]
#[command(name = "pianoroll", about = "Looping piano roll note editor")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tempo override
    #[arg(long)]
    bpm: Option<f64>,

    /// Pattern length override, in sixteenth-note columns
    #[arg(long)]
    pattern_length: Option<u32>,

    /// MIDI output port to connect at start-up
    #[arg(long)]
    midi_port: Option<usize>,
}

#[cfg(feature = "gui")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    if let Some(bpm) = cli.bpm {
        config.bpm = bpm;
    }
    if let Some(length) = cli.pattern_length {
        config.pattern_length = length;
    }
    config.validate()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 560.0])
            .with_title("Piano Roll"),
        ..Default::default()
    };

    eframe::run_native(
        "Piano Roll",
        options,
        Box::new(move |cc| Ok(Box::new(PianoRollApp::new(cc, config, cli.midi_port)))),
    )?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct PianoRollApp {
    editor: SharedPianoRoll,
    frame: SharedFrame,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,
    _transport: TransportHandle,

    // UI state
    grid: GridGeometry,
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    pointer_held: bool,
}

#[cfg(feature = "gui")]
impl PianoRollApp {
    fn new(cc: &eframe::CreationContext<'_>, config: EditorConfig, midi_port: Option<usize>) -> Self {
        let audio_output = AudioOutput::default();
        let midi_output = MidiOutputDevice::new();
        let available_midi_ports = MidiOutputDevice::available_ports();

        let selected_port = midi_port.and_then(|port| match midi_output.connect(port) {
            Ok(()) => Some(port),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        });

        let frame = SharedFrame::default();
        let ctx = cc.egui_ctx.clone();
        let canvas = FrameCanvas::new(Arc::clone(&frame)).with_waker(move || ctx.request_repaint());

        let players: Vec<Box<dyn NotePlayer + Send>> = vec![
            Box::new(audio_output.synth()),
            Box::new(midi_output.clone()),
        ];
        let editor = PianoRoll::from_config(&config, canvas, players).into_shared();
        let transport = Transport::start(Arc::clone(&editor));

        Self {
            editor,
            frame,
            audio_output,
            midi_output,
            _transport: transport,
            grid: GridGeometry::new(
                config.column_width,
                config.row_height,
                config.rows,
                config.pattern_length,
            ),
            available_midi_ports,
            selected_port,
            pointer_held: false,
        }
    }

    fn stop_playback(&mut self) {
        self.editor.lock().stop();
        self.audio_output.synth().stop_all();
    }

    fn transport_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let is_playing = self.editor.lock().is_playing();

            if is_playing {
                if ui.button("⏸ Stop").clicked() {
                    self.stop_playback();
                }
            } else if ui.button("▶ Play").clicked() {
                self.editor.lock().play();
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let mut bpm = self.editor.lock().bpm();
            if ui
                .add(egui::Slider::new(&mut bpm, 20.0..=300.0).step_by(1.0))
                .changed()
            {
                self.editor.lock().set_bpm(bpm);
            }

            ui.add_space(20.0);

            ui.label("Length:");
            let mut length = self.editor.lock().pattern_length();
            if ui
                .add(egui::DragValue::new(&mut length).clamp_range(1..=128))
                .changed()
            {
                self.editor.lock().resize(length);
            }

            ui.add_space(20.0);

            let transpose = self.editor.lock().transpose();
            ui.label(format!("Row 0 = {}", midi_note_name(transpose.clamp(0, 127) as u8)));
        });
    }

    fn midi_controls(&mut self, ui: &mut egui::Ui) {
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_id_source("midi_port")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(|name| name.as_str())
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name)
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
            }
        });

        if let Some(port_idx) = selected_port_changed {
            match self.midi_output.connect(port_idx) {
                Ok(()) => self.selected_port = Some(port_idx),
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    fn roll(&mut self, ui: &mut egui::Ui) {
        let (width, height) = self.editor.lock().geometry().surface_size();
        let (response, painter) =
            ui.allocate_painter(egui::vec2(width, height), egui::Sense::click_and_drag());
        let rect = response.rect;

        // Forward raw pointer input; the ctx lock is released before the
        // editor lock is taken.
        let (pressed, released, moving, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.is_moving(),
                i.pointer.interact_pos(),
            )
        });
        if let Some(pos) = pos {
            let local = pos - rect.min;
            let inside = rect.contains(pos);
            let mut editor = self.editor.lock();
            if pressed && inside {
                editor.pointer_down(local.x, local.y);
                self.pointer_held = true;
            }
            if moving && (inside || self.pointer_held) {
                editor.pointer_move(local.x, local.y);
            }
            if released && self.pointer_held {
                editor.pointer_up(local.x, local.y);
                self.pointer_held = false;
            }
        }

        let frame = self.frame.lock().clone();

        painter.rect_filled(rect, 0.0, egui::Color32::from_gray(235));

        let column_width = self.grid.column_width();
        let row_height = self.grid.row_height();
        let columns = (width / column_width).round() as u32;
        for row in 0..=self.grid.rows() {
            let y = rect.min.y + row as f32 * row_height;
            painter.line_segment(
                [egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)],
                egui::Stroke::new(1.0, egui::Color32::from_gray(210)),
            );
        }
        for column in 0..=columns {
            let x = rect.min.x + column as f32 * column_width;
            let shade = if column % 4 == 0 { 160 } else { 210 };
            painter.line_segment(
                [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
                egui::Stroke::new(1.0, egui::Color32::from_gray(shade)),
            );
        }

        if let Some(position) = frame.play_position {
            let x = rect.min.x + position as f32 * column_width;
            painter.rect_filled(
                egui::Rect::from_min_size(
                    egui::pos2(x, rect.min.y),
                    egui::vec2(column_width, height),
                ),
                0.0,
                egui::Color32::from_rgba_unmultiplied(100, 200, 100, 60),
            );
        }

        for (note, style) in &frame.notes {
            let [r, g, b, a] = style.rgba();
            let (x, y, w, h) = self.grid.note_rect(note);
            let note_rect =
                egui::Rect::from_min_size(rect.min + egui::vec2(x, y), egui::vec2(w, h)).shrink(1.0);
            let fill = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
            painter.rect_filled(note_rect, 2.0, fill);
            if *style == NoteStyle::Placed {
                painter.rect_stroke(
                    note_rect,
                    2.0,
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(150, 40, 40)),
                );
            }
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for PianoRollApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Piano Roll");
            ui.add_space(10.0);

            self.midi_controls(ui);
            ui.add_space(10.0);
            self.transport_controls(ui);
            ui.add_space(20.0);

            egui::ScrollArea::both().show(ui, |ui| {
                self.roll(ui);
            });

            // Info
            ui.separator();
            ui.label("Click to add or remove a note, drag right to lengthen it");
            if !self.audio_output.is_connected() {
                ui.colored_label(egui::Color32::YELLOW, "⚠ No audio device - playback is silent");
            }
            if !self.midi_output.is_connected() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI output connected - audio playback only",
                );
            }
        });
    }
}

#[cfg(feature = "gui")]
impl Drop for PianoRollApp {
    fn drop(&mut self) {
        self.midi_output.disconnect();
    }
}
