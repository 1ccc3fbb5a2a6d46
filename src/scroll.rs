use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportMetrics {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
    pub track_height: f64,
}

impl ViewportMetrics {
    fn max_scroll(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollSurface {
    GroupList,
    MessageList,
}

impl ScrollSurface {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GroupList => "group-list",
            Self::MessageList => "message-list",
        }
    }

    pub fn locks_selection(self) -> bool {
        matches!(self, Self::MessageList)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    ContentScrolled(ViewportMetrics),
    Resized(ViewportMetrics),
    ItemsChanged { count: usize, metrics: ViewportMetrics },
    ThumbGrabbed { pointer_y: f64, metrics: ViewportMetrics },
    PointerMoved { pointer_y: f64, metrics: ViewportMetrics },
    PointerReleased,
    // offset_y is measured from the top of the track.
    TrackClicked { offset_y: f64, metrics: ViewportMetrics },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollFrame {
    pub thumb_offset: f64,
    pub visible: bool,
    pub scroll_to: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging { start_pointer_y: f64, start_scroll_top: f64 },
}

#[derive(Debug, Clone)]
pub struct ScrollController {
    surface: ScrollSurface,
    thumb_height: f64,
    state: DragState,
    thumb_offset: f64,
    visible: bool,
    // Item count from the last ItemsChanged, reused when the viewport resizes.
    item_count: Option<usize>,
}

impl ScrollController {
    pub fn new(surface: ScrollSurface, thumb_height: f64) -> Self {
        Self {
            surface,
            thumb_height: thumb_height.max(0.0),
            state: DragState::Idle,
            thumb_offset: 0.0,
            visible: false,
            item_count: None,
        }
    }

    pub fn surface(&self) -> ScrollSurface {
        self.surface
    }

    pub fn thumb_height(&self) -> f64 {
        self.thumb_height
    }

    pub fn thumb_offset(&self) -> f64 {
        self.thumb_offset
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn wants_pointer_listeners(&self) -> bool {
        self.is_dragging()
    }

    pub fn selection_locked(&self) -> bool {
        self.is_dragging() && self.surface.locks_selection()
    }

    pub fn handle(&mut self, event: ScrollEvent) -> ScrollFrame {
        match event {
            ScrollEvent::ContentScrolled(metrics) => self.sync(&metrics),
            ScrollEvent::Resized(metrics) => self.resize(&metrics),
            ScrollEvent::ItemsChanged { count, metrics } => self.items_changed(count, &metrics),
            ScrollEvent::ThumbGrabbed { pointer_y, metrics } => self.grab(pointer_y, &metrics),
            ScrollEvent::PointerMoved { pointer_y, metrics } => self.drag_to(pointer_y, &metrics),
            ScrollEvent::PointerReleased => self.release(),
            ScrollEvent::TrackClicked { offset_y, metrics } => self.track_click(offset_y, &metrics),
        }
    }

    // Ignored mid-drag.
    pub fn sync(&mut self, metrics: &ViewportMetrics) -> ScrollFrame {
        if self.is_dragging() {
            return self.frame(None);
        }
        if !metrics.overflows() {
            self.thumb_offset = 0.0;
            self.visible = false;
            return self.frame(None);
        }
        self.thumb_offset = self.thumb_for_scroll(metrics.scroll_top, metrics);
        self.frame(None)
    }

    pub fn items_changed(&mut self, count: usize, metrics: &ViewportMetrics) -> ScrollFrame {
        self.item_count = Some(count);
        self.visible = count > 0 && metrics.overflows();
        self.sync(metrics)
    }

    pub fn resize(&mut self, metrics: &ViewportMetrics) -> ScrollFrame {
        if self.is_dragging() {
            return self.frame(None);
        }
        if let Some(count) = self.item_count {
            self.visible = count > 0 && metrics.overflows();
        }
        self.sync(metrics)
    }

    pub fn grab(&mut self, pointer_y: f64, metrics: &ViewportMetrics) -> ScrollFrame {
        self.state = DragState::Dragging {
            start_pointer_y: pointer_y,
            start_scroll_top: metrics.scroll_top,
        };
        tracing::trace!(surface = self.surface.as_str(), pointer_y, "thumb grabbed");
        self.frame(None)
    }

    pub fn drag_to(&mut self, pointer_y: f64, metrics: &ViewportMetrics) -> ScrollFrame {
        let DragState::Dragging {
            start_pointer_y,
            start_scroll_top,
        } = self.state
        else {
            return self.frame(None);
        };

        let max_scroll = metrics.max_scroll();
        let max_thumb = self.max_thumb_offset(metrics);
        if !(max_scroll > 0.0) || !(max_thumb > 0.0) {
            self.thumb_offset = 0.0;
            return self.frame(None);
        }

        let ratio = max_scroll / max_thumb;
        let delta = pointer_y - start_pointer_y;
        let scroll_top = (start_scroll_top + delta * ratio).clamp(0.0, max_scroll);
        self.thumb_offset = self.thumb_for_scroll(scroll_top, metrics);
        self.frame(Some(scroll_top))
    }

    pub fn release(&mut self) -> ScrollFrame {
        if self.is_dragging() {
            tracing::trace!(surface = self.surface.as_str(), thumb_offset = self.thumb_offset, "thumb released");
        }
        self.state = DragState::Idle;
        self.frame(None)
    }

    pub fn track_click(&mut self, offset_y: f64, metrics: &ViewportMetrics) -> ScrollFrame {
        if self.is_dragging() {
            return self.frame(None);
        }

        let max_scroll = metrics.max_scroll();
        let max_thumb = self.max_thumb_offset(metrics);
        if !(max_scroll > 0.0) || !(max_thumb > 0.0) {
            self.thumb_offset = 0.0;
            return self.frame(None);
        }

        let thumb_offset = (offset_y - self.thumb_height / 2.0).clamp(0.0, max_thumb);
        let scroll_top = thumb_offset / max_thumb * max_scroll;
        self.thumb_offset = thumb_offset;
        self.frame(Some(scroll_top))
    }

    fn max_thumb_offset(&self, metrics: &ViewportMetrics) -> f64 {
        metrics.track_height - self.thumb_height
    }

    fn thumb_for_scroll(&self, scroll_top: f64, metrics: &ViewportMetrics) -> f64 {
        let max_scroll = metrics.max_scroll();
        let max_thumb = self.max_thumb_offset(metrics);
        // Negated so NaN geometry lands here too.
        if !(max_scroll > 0.0) || !(max_thumb > 0.0) {
            return 0.0;
        }
        (scroll_top / max_scroll * max_thumb).clamp(0.0, max_thumb)
    }

    fn frame(&self, scroll_to: Option<f64>) -> ScrollFrame {
        ScrollFrame {
            thumb_offset: self.thumb_offset,
            visible: self.visible,
            scroll_to,
        }
    }
}
