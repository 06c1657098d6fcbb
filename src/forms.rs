use crate::{
    stats::MachineSlot,
    units::{
        self,
        MAX_BET_TOKENS,
        U256,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputField {
    EthAmount,
    SellAmount,
    BetAmount,
}

impl InputField {
    pub fn next(self) -> Self {
        match self {
            InputField::EthAmount => InputField::SellAmount,
            InputField::SellAmount => InputField::BetAmount,
            InputField::BetAmount => InputField::EthAmount,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEdit {
    Push(char),
    Backspace,
    Clear,
}

/// Text the player has typed into the three forms. Cleared after a
/// successful action, kept after a failed one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormInputs {
    pub eth_amount: String,
    pub sell_amount: String,
    pub bet_amount: String,
    pub selected_machine: MachineSlot,
}

impl FormInputs {
    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::EthAmount => &self.eth_amount,
            InputField::SellAmount => &self.sell_amount,
            InputField::BetAmount => &self.bet_amount,
        }
    }

    fn get_mut(&mut self, field: InputField) -> &mut String {
        match field {
            InputField::EthAmount => &mut self.eth_amount,
            InputField::SellAmount => &mut self.sell_amount,
            InputField::BetAmount => &mut self.bet_amount,
        }
    }

    /// Only digits and a single decimal point are accepted.
    pub fn apply(&mut self, field: InputField, edit: InputEdit) {
        let value = self.get_mut(field);
        match edit {
            InputEdit::Push(c) if c.is_ascii_digit() => value.push(c),
            InputEdit::Push('.') if !value.contains('.') => value.push('.'),
            InputEdit::Push(_) => {}
            InputEdit::Backspace => {
                value.pop();
            }
            InputEdit::Clear => value.clear(),
        }
    }

    pub fn clear(&mut self, field: InputField) {
        self.get_mut(field).clear();
    }
}

/// DGT received for `eth_input` at `tokens_per_eth`, two decimals.
pub fn buy_preview(eth_input: &str, tokens_per_eth: u64) -> String {
    match units::parse_ether(eth_input) {
        Ok(wei) => units::format_fixed(
            wei.saturating_mul(U256::from(tokens_per_eth)),
            units::TOKEN_DECIMALS,
            2,
        ),
        Err(_) => String::from("0"),
    }
}

/// ETH received for selling `token_input` DGT.
pub fn sell_preview(token_input: &str, tokens_per_eth: u64) -> String {
    match units::parse_tokens(token_input) {
        Ok(amount) if tokens_per_eth > 0 => {
            units::format_ether(amount / U256::from(tokens_per_eth))
        }
        _ => String::from("0"),
    }
}

/// Largest bet the player can place: `min(10000, balance)`.
pub fn bet_ceiling(balance: U256) -> U256 {
    units::tokens(MAX_BET_TOKENS).min(balance)
}
