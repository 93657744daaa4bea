//! User-facing reply texts
//!
//! Everything the assistant says back to a user is built here so the state
//! machine and the runtime only decide *which* reply to send.

/// Fixed reply when the classifier cannot be reached
pub const CLASSIFIER_UNAVAILABLE: &str =
    "Erro ao conectar com a inteligência artificial. Tente novamente mais tarde.";

/// Canned reply when the capabilities fallback produces nothing usable
pub const FALLBACK_CANNED: &str = "Desculpe, não consegui entender sua solicitação. Você pode tentar algo como: 'Adicionar despesa de 20 em comida' ou pedir o 'menu'.";

const MISSING_EXPENSE_SLOTS: &str = "Não consegui identificar o valor ou a categoria da despesa.";

const EXPENSE_USAGE_HINT: &str =
    "Poderia tentar novamente? Ex: Adicionar despesa de 50 na categoria Lazer";

/// Main menu greeting for `name`
pub fn main_menu(name: &str) -> String {
    let greeting = if name.trim().is_empty() {
        "Olá".to_string()
    } else {
        format!("Olá {}", name.trim())
    };
    format!(
        "{greeting}, sou o Wally, seu assistente virtual. Como posso ajudar você hoje?\n\n\
         1️⃣ Adicionar Despesa\n\
         2️⃣ Adicionar Categoria\n\
         3️⃣ Ver extrato\n\
         4️⃣ Ajuda"
    )
}

/// Confirmation for a recorded expense
pub fn expense_added(amount: f64, category: &str) -> String {
    format!("✅ Despesa de R${amount:.2} na categoria '{category}' adicionada com sucesso!")
}

/// Expense message with missing slots; `classifier_error` replaces the default explanation
pub fn expense_missing_slots(classifier_error: Option<&str>) -> String {
    let explanation = classifier_error.unwrap_or(MISSING_EXPENSE_SLOTS);
    format!("{explanation} {EXPENSE_USAGE_HINT}")
}

/// Expense amount that does not parse as a number
pub fn invalid_amount(normalized: &str) -> String {
    format!("O valor '{normalized}' não parece ser um número válido. Poderia tentar novamente?")
}

/// Action the assistant recognizes but does not handle
pub fn unhandled_action(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "Desculpe, não consegui processar sua solicitação. Tente pedir o 'menu'.".to_string()
    } else {
        format!("Desculpe {name}, não consegui processar sua solicitação. Tente pedir o 'menu'.")
    }
}
