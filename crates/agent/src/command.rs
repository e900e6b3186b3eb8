use review::FormField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Set(FormField, String),
    Approve,
    Reject(String),
    Skip,
    Reload,
    Count,
    Help,
    Quit,
}

pub const HELP: &str = "\
Comandos:
  show                   muestra la factura actual
  set <campo> <valor>    edita un campo (nit, name, date, product, value, invoiceNumber)
  approve                aprueba la factura
  reject <motivo>        rechaza la factura con el motivo indicado
  skip                   salta la factura
  reload                 vuelve a cargar la factura pendiente
  count                  actualiza el numero de facturas pendientes
  quit                   sale";

pub fn parse(input: &str) -> Result<Command, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Escriba un comando (help para ver la lista).".to_string());
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "show" | "s" => Ok(Command::Show),
        "set" | "e" => parse_set(rest),
        "approve" | "a" => Ok(Command::Approve),
        "reject" | "r" => {
            if rest.is_empty() {
                return Err("Indique el motivo del rechazo.".to_string());
            }
            Ok(Command::Reject(rest.to_string()))
        }
        "skip" | "n" => Ok(Command::Skip),
        "reload" => Ok(Command::Reload),
        "count" | "c" => Ok(Command::Count),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("Comando desconocido: {other}")),
    }
}

fn parse_set(rest: &str) -> Result<Command, String> {
    let (field_raw, value) = match rest.split_once(char::is_whitespace) {
        Some((field, value)) => (field, value.trim()),
        None => (rest, ""),
    };
    if field_raw.is_empty() {
        return Err("Indique el campo a editar.".to_string());
    }
    let field = field_raw
        .parse::<FormField>()
        .map_err(|_| format!("Campo desconocido: {field_raw}"))?;
    Ok(Command::Set(field, value.to_string()))
}
