//! Native window shell: winit event loop, wgpu presentation, rfd dialogs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pb_gpu::{GpuContext, GpuError};
use thiserror::Error;
use tiny_skia::PixmapRef;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key as WinitKey, KeyCode, NamedKey, PhysicalKey},
    window::{Window, WindowBuilder},
};

use crate::app::{App, Response, ShellRequest};
use crate::config::{AppConfig, UserPreferences};
use crate::constants::window::{DEFAULT_SIZE, MIN_SIZE, TITLE};
use crate::event::{InputEvent, Key, Modifiers, PointerButton};
use crate::file_list::IMAGE_EXTENSIONS;
use crate::geometry::Vec2;
use crate::render::{Present, RenderError};

const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);
const DOUBLE_CLICK_DISTANCE: f32 = 4.0;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What the shell needs besides the preferences in effect for this session.
#[derive(Debug)]
pub struct Launch {
    /// Settings as stored on disk; written back on exit.
    pub config: AppConfig,
    pub config_path: Option<PathBuf>,
    /// Stored preferences with command line overrides applied.
    pub session: UserPreferences,
    /// File or folder to open at startup.
    pub initial_path: Option<PathBuf>,
}

/// Presents frames to the window surface.
struct SurfacePresenter<'a>(&'a mut GpuContext);

impl Present for SurfacePresenter<'_> {
    type Error = GpuError;

    fn present(&mut self, frame: PixmapRef<'_>) -> Result<(), GpuError> {
        self.0.present_rgba(frame.data(), frame.width(), frame.height())
    }
}

struct Shell {
    window: Arc<Window>,
    gpu: GpuContext,
    app: App,
    cursor: Vec2,
    modifiers: Modifiers,
    last_click: Option<(Instant, Vec2)>,
}

impl Shell {
    fn redraw(&mut self) {
        let mut presenter = SurfacePresenter(&mut self.gpu);
        match self.app.render_into(&mut presenter) {
            Ok(()) => {}
            Err(RenderError::Present(e)) => {
                // Lost or outdated surfaces are reconfigured; try again next frame
                log::debug!("Present failed: {}", e);
                self.window.request_redraw();
            }
            Err(e) => log::error!("Render failed: {}", e),
        }
    }

    fn dispatch(&mut self, event: InputEvent) {
        let response = self.app.handle_event(event);
        self.apply(response);
    }

    /// Carry out a response, including any dialogs it asks for.
    fn apply(&mut self, mut response: Response) {
        let mut repaint = response.repaint;

        while let Some(request) = response.request.take() {
            response = self.run_request(request);
            repaint |= response.repaint;
        }

        self.window.set_title(&self.app.title());
        if repaint {
            self.window.request_redraw();
        }
    }

    fn run_request(&mut self, request: ShellRequest) -> Response {
        match request {
            ShellRequest::OpenDialog => {
                let mut dialog = rfd::FileDialog::new().add_filter("Images", IMAGE_EXTENSIONS);
                if let Some(folder) = self.app.files().folder() {
                    dialog = dialog.set_directory(folder);
                }
                match dialog.pick_file() {
                    Some(path) => self.app.open(&path),
                    None => Response::none(),
                }
            }
            ShellRequest::ConfirmDelete(path) => {
                if confirm_delete(&path) {
                    self.app.delete_current()
                } else {
                    Response::none()
                }
            }
            ShellRequest::ShowError(message) => {
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title(TITLE)
                    .set_description(message)
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
                Response::none()
            }
        }
    }

    fn pointer_pressed(&mut self, button: MouseButton, state: ElementState) {
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => PointerButton::Middle,
            MouseButton::Other(n) => PointerButton::Other(n),
            _ => return,
        };
        let position = self.cursor;

        let event = match state {
            ElementState::Pressed => {
                // Quick clicks on a button are two commands, not a maximize
                if button == PointerButton::Primary
                    && !self.app.hit_control(position)
                    && self.is_double_click(position)
                {
                    self.window.set_maximized(!self.window.is_maximized());
                    return;
                }
                InputEvent::PointerDown { button, position }
            }
            ElementState::Released => InputEvent::PointerUp { button, position },
        };
        self.dispatch(event);
    }

    fn is_double_click(&mut self, position: Vec2) -> bool {
        let now = Instant::now();
        let double = self.last_click.is_some_and(|(at, from)| {
            let travel = position - from;
            now.duration_since(at) <= DOUBLE_CLICK_INTERVAL
                && travel.x.abs() <= DOUBLE_CLICK_DISTANCE
                && travel.y.abs() <= DOUBLE_CLICK_DISTANCE
        });
        // A third click starts a new pair
        self.last_click = if double { None } else { Some((now, position)) };
        double
    }

    fn key_pressed(&mut self, logical: &WinitKey, physical: PhysicalKey) {
        let key = match (logical, physical) {
            (_, PhysicalKey::Code(KeyCode::NumpadAdd)) => Key::NumpadAdd,
            (_, PhysicalKey::Code(KeyCode::NumpadSubtract)) => Key::NumpadSubtract,
            (WinitKey::Named(NamedKey::ArrowLeft), _) => Key::Left,
            (WinitKey::Named(NamedKey::ArrowRight), _) => Key::Right,
            (WinitKey::Named(NamedKey::ArrowUp), _) => Key::Up,
            (WinitKey::Named(NamedKey::ArrowDown), _) => Key::Down,
            (WinitKey::Named(NamedKey::Delete), _) => Key::Delete,
            (WinitKey::Named(NamedKey::Escape), _) => Key::Escape,
            (WinitKey::Character(text), _) => match text.chars().next() {
                Some(c) => Key::Char(c),
                None => return,
            },
            _ => return,
        };
        self.dispatch(InputEvent::KeyPressed {
            key,
            modifiers: self.modifiers,
        });
    }

    fn save_settings(&self, launch: &mut Launch) {
        let prefs = &mut launch.config.preferences;
        prefs.last_path = self.app.current_path().map(Path::to_path_buf);
        // Only persist caching if the user toggled it, not a --no-cache override
        if self.app.use_caching() != launch.session.use_caching {
            prefs.use_caching = self.app.use_caching();
        }

        let result = match &launch.config_path {
            Some(path) => launch.config.save(path),
            None => launch.config.save_to_default_path(),
        };
        if let Err(e) = result {
            log::warn!("Failed to save settings: {}", e);
        }
    }
}

fn confirm_delete(path: &Path) -> bool {
    let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
    let answer = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title("Delete image")
        .set_description(format!("Delete {} permanently?", name))
        .set_buttons(rfd::MessageButtons::YesNo)
        .show();
    matches!(answer, rfd::MessageDialogResult::Yes)
}

/// Open the window and run until it is closed.
pub fn run(mut launch: Launch) -> Result<(), ShellError> {
    let event_loop = EventLoop::new()?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(DEFAULT_SIZE.0, DEFAULT_SIZE.1))
            .with_min_inner_size(LogicalSize::new(MIN_SIZE.0, MIN_SIZE.1))
            .build(&event_loop)?,
    );

    let gpu = pollster::block_on(GpuContext::new(Arc::clone(&window)))?;
    log::info!("GPU context ready: {}x{}", gpu.width(), gpu.height());

    let app = App::new(&launch.session, gpu.width(), gpu.height())?;

    let mut shell = Shell {
        window: Arc::clone(&window),
        gpu,
        app,
        cursor: Vec2::ZERO,
        modifiers: Modifiers::NONE,
        last_click: None,
    };

    if let Some(path) = launch.initial_path.take() {
        let response = shell.app.open(&path);
        shell.apply(response);
    }

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);

        let Event::WindowEvent { event, .. } = event else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                shell.save_settings(&mut launch);
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                shell.gpu.resize(size.width, size.height);
                shell.dispatch(InputEvent::Resized {
                    width: shell.gpu.width(),
                    height: shell.gpu.height(),
                });
            }
            WindowEvent::RedrawRequested => shell.redraw(),
            WindowEvent::CursorMoved { position, .. } => {
                shell.cursor = Vec2::new(position.x as f32, position.y as f32);
                shell.dispatch(InputEvent::PointerMoved {
                    position: shell.cursor,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => shell.pointer_pressed(button, state),
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                shell.modifiers = Modifiers {
                    shift: state.shift_key(),
                    ctrl: state.control_key() || state.super_key(),
                    alt: state.alt_key(),
                };
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                shell.key_pressed(&event.logical_key, event.physical_key);
            }
            WindowEvent::DroppedFile(path) => shell.dispatch(InputEvent::FileDropped(path)),
            _ => {}
        }
    })?;

    Ok(())
}
