pub mod cache;
pub mod channel_tree;
pub mod error;
pub mod navigator;
pub mod sidebar;
pub mod switcher;

pub use cache::{ChannelCache, ChannelDirectory, InMemoryChannelCache, MissingChannelDirectory};
pub use channel_tree::{Change, ChannelTree, Node, TreePath};
pub use error::{FetchError, SidebarError};
pub use navigator::{GuildOpened, SidebarNavigator};
pub use sidebar::{
    fetch_listing, ChannelSidebar, ListingOutcome, PendingListing, RowActivation, SidebarAction,
};
pub use switcher::{MatchQuality, QuickSwitcher, SwitcherMatch};
