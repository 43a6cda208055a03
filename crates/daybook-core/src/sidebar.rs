use tracing::{debug, warn};

use crate::session::User;

pub const PLACEHOLDER_MESSAGE: &str = "Select a view from the sidebar.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AppView {
    Today,
    Inbox,
    #[default]
    Calendar,
    Tasks,
    Notes,
    Contacts,
}

impl AppView {
    pub fn all() -> [Self; 6] {
        [
            Self::Today,
            Self::Inbox,
            Self::Calendar,
            Self::Tasks,
            Self::Notes,
            Self::Contacts,
        ]
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Inbox => "inbox",
            Self::Calendar => "calendar",
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::Contacts => "contacts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Inbox => "Inbox",
            Self::Calendar => "Calendar",
            Self::Tasks => "Tasks",
            Self::Notes => "Notes",
            Self::Contacts => "Contacts",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::all().into_iter().find(|view| view.as_key() == key)
    }

    /// Which panel the page shell mounts for this entry.
    pub fn content(self) -> MainContent {
        match self {
            Self::Calendar => MainContent::Calendar,
            Self::Tasks | Self::Inbox => MainContent::Tasks,
            Self::Today | Self::Notes | Self::Contacts => MainContent::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainContent {
    Calendar,
    Tasks,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub view: AppView,
    pub count: Option<usize>,
}

impl NavItem {
    fn plain(view: AppView) -> Self {
        Self { view, count: None }
    }

    fn counted(view: AppView, count: usize) -> Self {
        Self {
            view,
            count: Some(count),
        }
    }

    pub fn label(&self) -> &'static str {
        self.view.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSection {
    pub title: Option<&'static str>,
    pub items: Vec<NavItem>,
}

/// The fixed navigation list. Inbox and Tasks carry the open task count.
pub fn default_sections(open_tasks: usize) -> Vec<NavSection> {
    vec![
        NavSection {
            title: None,
            items: vec![
                NavItem::plain(AppView::Today),
                NavItem::counted(AppView::Inbox, open_tasks),
                NavItem::plain(AppView::Calendar),
            ],
        },
        NavSection {
            title: Some("Lists"),
            items: vec![
                NavItem::counted(AppView::Tasks, open_tasks),
                NavItem::plain(AppView::Notes),
                NavItem::plain(AppView::Contacts),
            ],
        },
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarState {
    active: AppView,
    collapsed: bool,
}

impl SidebarState {
    pub fn new(active: AppView, collapsed: bool) -> Self {
        Self { active, collapsed }
    }

    pub fn active(&self) -> AppView {
        self.active
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Unknown keys leave the selection alone.
    pub fn select(&mut self, key: &str) -> Option<AppView> {
        let Some(view) = AppView::from_key(key) else {
            warn!(key, "unknown navigation entry");
            return None;
        };
        self.set_active(view);
        Some(view)
    }

    pub fn set_active(&mut self, view: AppView) {
        debug!(from = self.active.as_key(), to = view.as_key(), "switching view");
        self.active = view;
    }

    pub fn toggle_collapse(&mut self) -> bool {
        self.collapsed = !self.collapsed;
        self.collapsed
    }
}

/// Avatar letter: name, then email, then `U`.
pub fn avatar_initial(user: Option<&User>) -> char {
    user.and_then(|user| {
        user.name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .or_else(|| {
                user.email
                    .as_deref()
                    .and_then(|email| email.trim().chars().next())
            })
    })
    .map(|c| c.to_ascii_uppercase())
    .unwrap_or('U')
}
