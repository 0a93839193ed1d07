use crate::app::App;
use crate::input::InputAction;

pub fn dispatch(app: &mut App, action: InputAction) {
    match action {
        InputAction::None => {}
        InputAction::Quit => app.quit(),
        InputAction::ToggleHelp => app.show_help = !app.show_help,
        InputAction::Draw => app.draw(),
        InputAction::Skip => app.skip(),
        InputAction::Purge => app.purge(),
        InputAction::Cancel => app.cancel(),
    }
}
