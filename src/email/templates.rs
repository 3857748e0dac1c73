// Email templates

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Password reset link, valid for one hour
pub fn password_reset(to: &str, reset_link: &str) -> EmailMessage {
    let link = escape_html(reset_link);
    EmailMessage {
        to: to.to_string(),
        subject: "Redefinição de senha - Pastoral Familiar".to_string(),
        text: format!(
            "Recebemos um pedido para redefinir sua senha.\n\n\
             Acesse o link abaixo para criar uma nova senha (válido por 1 hora):\n{}\n\n\
             Se você não fez este pedido, ignore este email.",
            reset_link
        ),
        html: format!(
            "<p>Recebemos um pedido para redefinir sua senha.</p>\
             <p><a href=\"{link}\">Criar nova senha</a> (válido por 1 hora)</p>\
             <p>Se você não fez este pedido, ignore este email.</p>"
        ),
    }
}

/// Sent when an administrator creates an account
pub fn welcome(to: &str, nome: &str, login_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Bem-vindo ao sistema de avaliações da Pastoral Familiar".to_string(),
        text: format!(
            "Olá, {}!\n\nSua conta foi criada. Acesse o sistema em:\n{}\n\n\
             Use a opção \"Esqueci minha senha\" caso ainda não tenha recebido sua senha.",
            nome, login_url
        ),
        html: format!(
            "<p>Olá, {}!</p><p>Sua conta foi criada.</p>\
             <p><a href=\"{}\">Acessar o sistema</a></p>",
            escape_html(nome),
            escape_html(login_url)
        ),
    }
}

/// Sent to the pastoral when a couple asks to be contacted
pub fn interest_notification(
    to: &str,
    encontro_nome: Option<&str>,
    nome_contato: Option<&str>,
    telefone: Option<&str>,
    email: Option<&str>,
) -> EmailMessage {
    let encontro = encontro_nome.unwrap_or("sem encontro vinculado");
    let nome = nome_contato.unwrap_or("(não informado)");
    let telefone = telefone.unwrap_or("(não informado)");
    let email = email.unwrap_or("(não informado)");

    EmailMessage {
        to: to.to_string(),
        subject: "Novo casal interessado na Pastoral Familiar".to_string(),
        text: format!(
            "Um casal demonstrou interesse em participar da pastoral.\n\n\
             Encontro: {}\nContato: {}\nTelefone: {}\nEmail: {}",
            encontro, nome, telefone, email
        ),
        html: format!(
            "<p>Um casal demonstrou interesse em participar da pastoral.</p>\
             <ul><li>Encontro: {}</li><li>Contato: {}</li><li>Telefone: {}</li><li>Email: {}</li></ul>",
            escape_html(encontro),
            escape_html(nome),
            escape_html(telefone),
            escape_html(email)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contains_link() {
        let message = password_reset("a@example.com", "http://x/reset-password?token=abc&x=1");
        assert!(message.text.contains("http://x/reset-password?token=abc&x=1"));
        assert!(message.html.contains("token=abc&amp;x=1"));
    }

    #[test]
    fn test_notification_escapes_user_input() {
        let message = interest_notification(
            "pastoral@example.com",
            Some("Encontro de Março"),
            Some("<script>"),
            None,
            None,
        );
        assert!(message.html.contains("&lt;script&gt;"));
        assert!(message.text.contains("(não informado)"));
    }
}
