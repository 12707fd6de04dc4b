pub const ASK_FIRST_ACTOR: &str = "Enter the first actor's name";
pub const ASK_SECOND_ACTOR: &str = "Enter the second actor's name";
pub const ENTER_NAME: &str = "Please enter an actor's name.";
pub const SEND_START: &str = "Send /start to begin a new search.";
pub const HELP: &str =
    "This bot finds the movies two actors played in together.\nSend /start to begin a search.";
pub const UNKNOWN_COMMAND: &str = "Unknown command.\nSend /start to begin a new search.";

pub const NO_ACTORS_FOUND: &str = "No actors found for this name. Try another spelling.";
pub const CANDIDATES_FOUND: &str = "Found:";
pub const PROFILE_LABEL: &str = "Kinopoisk";
pub const SELECT_LABEL: &str = "Select";

pub const INVALID_SELECTION: &str = "Invalid selection";
pub const SELECTION_EXPIRED: &str = "This selection is no longer available";
pub const DUPLICATE_NOTICE: &str = "This actor is already selected";
pub const DUPLICATE_ACTOR: &str =
    "The same actor was selected twice. Send /start to start over.";

pub const NO_COMMON_MOVIES: &str = "These actors have no movies in common.";
pub const COMMON_MOVIES: &str = "Common movies:";
pub const GENERIC_FAILURE: &str = "Something went wrong. Send /start to try again.";
pub const SHUTDOWN_NOTICE: &str =
    "The bot is restarting and your search was interrupted. Send /start once it is back.";

pub fn too_many_movies(count: usize) -> String {
    format!("The actors have {count} movies in common, too many to show.")
}
