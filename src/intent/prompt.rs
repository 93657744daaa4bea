//! Prompt templates for intent classification

const CLASSIFICATION_PROMPT: &str = r#"Analise a seguinte mensagem do usuário para um bot de finanças pessoais.
Extraia a intenção principal e quaisquer parâmetros relevantes.
Responda APENAS com um objeto JSON no seguinte formato:
{
  "action": "SUA_ACAO_DETECTADA",
  "parameters": {
    "amount": "valor_da_despesa",
    "category": "categoria_da_despesa",
    "description": "descricao_detalhada_da_despesa"
  },
  "error": "mensagem_de_erro_se_houver"
}

Ações possíveis e seus parâmetros:
- "add_expense": Adicionar uma nova despesa.
  - Parâmetros esperados: "amount" (número como string, ex: "100.50"), "category" (texto, ex: "lazer"), "description" (texto opcional).
- "show_menu": Se o usuário pedir o menu, ajuda, ou fizer uma saudação inicial (oi, olá, etc.).
  - Sem parâmetros.
- "unknown_intent": Se a intenção não for clara, não corresponder a nenhuma ação conhecida, ou se faltarem informações cruciais.
  - Campo opcional "error" com uma breve descrição do problema.

Exemplos:
1. Usuário: "adicionar despesa de 100 reais com assinatura do GPT"
   JSON: {"action": "add_expense", "parameters": {"amount": "100", "category": "Assinatura", "description": "Assinatura do GPT"}}
2. Usuário: "gastei 25.50 com café"
   JSON: {"action": "add_expense", "parameters": {"amount": "25.50", "category": "café", "description": "café"}}
3. Usuário: "menu"
   JSON: {"action": "show_menu", "parameters": {}}
4. Usuário: "quero ver meu saldo"
   JSON: {"action": "unknown_intent", "parameters": {}, "error": "Funcionalidade 'ver saldo' ainda não suportada."}
"#;

/// Build the classification prompt, prefixing learned context when present
pub fn classification_prompt(message: &str, learned_context: &str) -> String {
    let context_block = if learned_context.trim().is_empty() {
        String::new()
    } else {
        format!(
            "Contexto aprendido de interações anteriores (use isso para ajudar a entender a mensagem atual):\n{}\n\n",
            learned_context.trim_end()
        )
    };
    format!("{context_block}{CLASSIFICATION_PROMPT}\nMensagem do usuário: \"{message}\"")
}

/// Frame a message the assistant could not act on as a request to explain
/// what it can do
pub fn capabilities_prompt(message: &str) -> String {
    format!(
        "Você é um assistente financeiro simpático. O usuário perguntou: \"{message}\"\n\
         Se não for possível executar a ação, responda de forma educada, explique o que você pode fazer \
         e sugira exemplos de comandos válidos."
    )
}
