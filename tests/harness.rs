use dapps_game::{
    GameController,
    forms::{
        InputEdit,
        InputField,
    },
};

mod place_bet;
mod sell_tokens;

/// Types `text` into `field` one key at a time.
pub fn type_amount(controller: &mut GameController, field: InputField, text: &str) {
    for c in text.chars() {
        controller.edit_input(field, InputEdit::Push(c));
    }
}
