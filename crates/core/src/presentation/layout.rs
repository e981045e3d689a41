use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Panel {
    Video,
    AlignedFace,
    Descriptor,
    Readouts,
}

impl Panel {
    pub const ALL: [Panel; 4] = [
        Panel::Video,
        Panel::AlignedFace,
        Panel::Descriptor,
        Panel::Readouts,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Panel::Video => "Video",
            Panel::AlignedFace => "Aligned face",
            Panel::Descriptor => "Descriptor",
            Panel::Readouts => "Readouts",
        }
    }
}

/// Which presentation panels are shown. Changing visibility is a layout-only
/// refresh on the UI thread, independent of frame cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelLayout {
    pub video: bool,
    pub aligned_face: bool,
    pub descriptor: bool,
    pub readouts: bool,
}

/// Result of a visibility change: the layout to apply and whether it differs
/// from the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutRefresh {
    pub layout: PanelLayout,
    pub changed: bool,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            video: true,
            aligned_face: true,
            descriptor: true,
            readouts: true,
        }
    }
}

impl PanelLayout {
    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Video => self.video,
            Panel::AlignedFace => self.aligned_face,
            Panel::Descriptor => self.descriptor,
            Panel::Readouts => self.readouts,
        }
    }

    pub fn set_visible(&mut self, panel: Panel, visible: bool) -> LayoutRefresh {
        let slot = match panel {
            Panel::Video => &mut self.video,
            Panel::AlignedFace => &mut self.aligned_face,
            Panel::Descriptor => &mut self.descriptor,
            Panel::Readouts => &mut self.readouts,
        };
        let changed = *slot != visible;
        *slot = visible;
        LayoutRefresh {
            layout: *self,
            changed,
        }
    }

    pub fn toggle(&mut self, panel: Panel) -> LayoutRefresh {
        let visible = !self.is_visible(panel);
        self.set_visible(panel, visible)
    }

    pub fn visible_panels(&self) -> Vec<Panel> {
        Panel::ALL
            .into_iter()
            .filter(|p| self.is_visible(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shows_every_panel() {
        assert_eq!(PanelLayout::default().visible_panels(), Panel::ALL.to_vec());
    }

    #[test]
    fn test_hiding_twice_is_idempotent() {
        let mut layout = PanelLayout::default();
        let first = layout.set_visible(Panel::Video, false);
        let second = layout.set_visible(Panel::Video, false);

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.layout, second.layout);
        assert!(!layout.is_visible(Panel::Video));
    }

    #[test]
    fn test_toggle_flips_one_panel() {
        let mut layout = PanelLayout::default();
        let refresh = layout.toggle(Panel::Descriptor);
        assert!(refresh.changed);
        assert_eq!(
            refresh.layout.visible_panels(),
            vec![Panel::Video, Panel::AlignedFace, Panel::Readouts]
        );
        layout.toggle(Panel::Descriptor);
        assert_eq!(layout, PanelLayout::default());
    }
}
