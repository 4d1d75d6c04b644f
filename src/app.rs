//! The application context.
//!
//! [`App`] owns every component of the viewer and is passed by `&mut` into
//! every handler; there is no global state. Input arrives as
//! [`InputEvent`]s and each handler returns a [`Response`] telling the shell
//! whether to repaint and whether it has to do something only the shell can
//! do (show a dialog).

use std::path::{Path, PathBuf};

use crate::config::UserPreferences;
use crate::constants::window::TITLE;
use crate::controls::{default_controls, Command, Control};
use crate::drag::DragSession;
use crate::event::{InputEvent, Key, Modifiers, PointerButton};
use crate::file_list::FileList;
use crate::geometry::{Size, Vec2};
use crate::image_cache::ImageCache;
use crate::render::{Compositor, Present, RenderError};
use crate::viewport::{ViewportState, ZoomStep};

/// Work the application hands back to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellRequest {
    /// Ask the user for a file or folder and pass it to [`App::open`].
    OpenDialog,
    /// Ask before deleting; on confirmation call [`App::delete_current`].
    ConfirmDelete(PathBuf),
    /// Show a recoverable error to the user.
    ShowError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub repaint: bool,
    pub request: Option<ShellRequest>,
}

impl Response {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn repaint() -> Self {
        Self {
            repaint: true,
            request: None,
        }
    }

    pub fn repaint_if(repaint: bool) -> Self {
        Self {
            repaint,
            request: None,
        }
    }

    pub fn request(request: ShellRequest) -> Self {
        Self {
            repaint: false,
            request: Some(request),
        }
    }

    fn error(message: impl std::fmt::Display) -> Self {
        let message = message.to_string();
        log::warn!("{}", message);
        Self::request(ShellRequest::ShowError(message))
    }
}

/// Map a key press to a command.
pub fn command_for_key(key: Key, modifiers: Modifiers) -> Option<Command> {
    let command = match key {
        Key::Char(c) if modifiers.ctrl => match c.to_ascii_lowercase() {
            'o' => Command::Open,
            _ => return None,
        },
        Key::Char('+' | '=') | Key::NumpadAdd => Command::Zoom(ZoomStep::In),
        Key::Char('-') | Key::NumpadSubtract => Command::Zoom(ZoomStep::Out),
        Key::Char('c' | 'C') => Command::ToggleCaching,
        Key::Char('r' | 'R') | Key::Escape => Command::ResetView,
        Key::Left | Key::Up => Command::Previous,
        Key::Right | Key::Down => Command::Next,
        Key::Delete => Command::DeleteCurrent,
        _ => return None,
    };
    Some(command)
}

pub struct App {
    files: FileList,
    cache: ImageCache,
    compositor: Compositor,
    viewport: ViewportState,
    drag: DragSession,
    controls: Vec<Box<dyn Control>>,
}

impl App {
    /// Build the viewer for a `width` x `height` canvas.
    ///
    /// Fails only if the rendering context cannot be created.
    pub fn new(preferences: &UserPreferences, width: u32, height: u32) -> Result<Self, RenderError> {
        let compositor = Compositor::new(width, height, preferences.max_bitmap_dimension)?;
        let cache = ImageCache::new(compositor.binding(), preferences.use_caching);

        let mut app = Self {
            files: FileList::new(),
            cache,
            compositor,
            viewport: ViewportState::new(),
            drag: DragSession::new(preferences.drag_threshold),
            controls: default_controls(),
        };
        app.layout_controls();
        Ok(app)
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    pub fn files(&self) -> &FileList {
        &self.files
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn use_caching(&self) -> bool {
        self.cache.use_caching()
    }

    /// The file the viewer is on, whether or not it decoded.
    pub fn current_path(&self) -> Option<&Path> {
        self.files.current()
    }

    /// Window title: the application name plus the current file name.
    pub fn title(&self) -> String {
        match self.files.current().and_then(Path::file_name) {
            Some(name) => format!("{} - {}", TITLE, name.to_string_lossy()),
            None => TITLE.to_string(),
        }
    }

    /// Whether `position` lands on an on-canvas control.
    pub fn hit_control(&self, position: Vec2) -> bool {
        self.controls.iter().any(|control| control.hit_test(position))
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Response {
        match event {
            InputEvent::PointerDown {
                button: PointerButton::Primary,
                position,
            } => {
                let hit = self
                    .controls
                    .iter()
                    .find(|control| control.hit_test(position))
                    .map(|control| control.command());
                if let Some(command) = hit {
                    return self.execute(command);
                }
                self.drag.pointer_down(position);
                Response::none()
            }
            InputEvent::PointerMoved { position } => {
                Response::repaint_if(self.drag.pointer_move(position, &mut self.viewport))
            }
            InputEvent::PointerUp {
                button: PointerButton::Primary,
                ..
            } => Response::repaint_if(self.drag.pointer_up()),
            InputEvent::PointerDown { .. } | InputEvent::PointerUp { .. } => Response::none(),
            InputEvent::KeyPressed { key, modifiers } => match command_for_key(key, modifiers) {
                Some(command) => self.execute(command),
                None => Response::none(),
            },
            InputEvent::Resized { width, height } => self.resize(width, height),
            InputEvent::FileDropped(path) => self.open(&path),
        }
    }

    pub fn execute(&mut self, command: Command) -> Response {
        log::debug!("Command {:?}", command);
        match command {
            Command::Zoom(step) => match self.viewport.step_zoom(step) {
                Some(factor) => {
                    self.drag.rescale(factor);
                    Response::repaint()
                }
                None => Response::none(),
            },
            Command::Previous => match self.files.previous().map(Path::to_path_buf) {
                Some(path) => self.select(&path),
                None => Response::none(),
            },
            Command::Next => match self.files.next().map(Path::to_path_buf) {
                Some(path) => self.select(&path),
                None => Response::none(),
            },
            Command::ResetView => {
                self.viewport.reset();
                self.drag.reset();
                Response::repaint()
            }
            Command::DeleteCurrent => match self.files.current() {
                Some(path) => Response::request(ShellRequest::ConfirmDelete(path.to_path_buf())),
                None => Response::none(),
            },
            Command::ToggleCaching => {
                let enabled = !self.cache.use_caching();
                self.cache.set_use_caching(enabled);
                Response::none()
            }
            Command::Open => Response::request(ShellRequest::OpenDialog),
        }
    }

    /// Open a folder, or a file together with its folder.
    ///
    /// Drops every cached image of the previous folder.
    pub fn open(&mut self, path: &Path) -> Response {
        if let Err(e) = self.files.open(path) {
            return Response::error(e);
        }

        self.cache.clear();
        self.viewport.reset();
        self.drag.reset();

        match self.files.current().map(Path::to_path_buf) {
            Some(current) => self.select(&current),
            None => {
                log::info!("No images in {:?}", path);
                Response::repaint()
            }
        }
    }

    /// Display `path`. The view is reset only if the path actually changes.
    pub fn select(&mut self, path: &Path) -> Response {
        let changed = !self.cache.is_current(path);

        if let Err(e) = self.cache.set_current(path).map(|_| ()) {
            // Show the background rather than the previous image under this name
            self.cache.deselect();
            self.viewport.reset();
            self.drag.reset();
            return Response {
                repaint: true,
                ..Response::error(e)
            };
        }

        if changed {
            self.viewport.reset();
            self.drag.reset();
            log::info!("Showing {:?}", path);
        }
        Response::repaint()
    }

    /// Delete the current file after the user confirmed it.
    pub fn delete_current(&mut self) -> Response {
        let Some(path) = self.files.current().map(Path::to_path_buf) else {
            return Response::none();
        };

        if let Err(e) = self.cache.delete(&path) {
            return Response::error(e);
        }

        match self.files.remove_current().map(Path::to_path_buf) {
            Some(next) => self.select(&next),
            None => {
                self.viewport.reset();
                self.drag.reset();
                Response::repaint()
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Response {
        if let Err(e) = self.compositor.resize(width, height) {
            log::error!("{}", e);
            return Response::none();
        }
        self.layout_controls();
        Response::repaint()
    }

    /// Replace the rendering context and reload the current image into it.
    pub fn recreate_context(&mut self) -> Result<(), RenderError> {
        let binding = self.compositor.recreate_context()?;
        let current = self.cache.current_path().map(Path::to_path_buf);

        // `rebind` consumes the old cache, so the field holds an empty one meanwhile
        let placeholder = ImageCache::new(binding.clone(), self.cache.use_caching());
        let old = std::mem::replace(&mut self.cache, placeholder);
        self.cache = old.rebind(binding);

        if let Some(path) = current {
            if let Err(e) = self.cache.set_current(&path).map(|_| ()) {
                log::warn!("Failed to reload {:?} after context change: {}", path, e);
            }
        }
        Ok(())
    }

    /// Paint a frame and hand it to `sink`.
    pub fn render_into<P: Present>(&mut self, sink: &mut P) -> Result<(), RenderError> {
        match self.compositor.render(&mut self.cache, &self.viewport, &self.drag) {
            Ok(_) => {}
            Err(e @ RenderError::StaleResource { .. }) => log::warn!("{}", e),
            Err(e) => return Err(e),
        }

        let target = self.compositor.back_buffer_mut();
        for control in &self.controls {
            control.draw(target);
        }

        self.compositor.present(sink)
    }

    fn layout_controls(&mut self) {
        let canvas: Size = self.compositor.size();
        for control in &mut self.controls {
            control.layout(canvas);
        }
    }
}
