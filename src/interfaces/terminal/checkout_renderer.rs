use crate::application::gateway::{GatewayState, GatewayStatus};
use crate::application::pix_payment::{PixSession, PixStatus};
use crate::domain::card::{FieldErrors, PaymentReceipt};
use crate::domain::checkout::CheckoutState;
use crate::domain::plan::{InstallmentQuote, Plan, PlanCatalog};
use crate::domain::validation::format_brl;
use std::io::{self, Write};

/// Formats seconds as `mm:ss`.
pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Writes checkout screens as plain text.
pub struct CheckoutRenderer<W: Write> {
    writer: W,
}

impl<W: Write> CheckoutRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_step(&mut self, state: &CheckoutState) -> io::Result<()> {
        writeln!(self.writer, "{}", state.step_indicator())
    }

    pub fn write_plans(&mut self, catalog: &PlanCatalog) -> io::Result<()> {
        for plan in catalog.iter() {
            self.write_plan(plan)?;
        }
        Ok(())
    }

    pub fn write_plan(&mut self, plan: &Plan) -> io::Result<()> {
        writeln!(
            self.writer,
            "{} ({}) R$ {}/mês, R$ {}/ano",
            plan.name,
            plan.id,
            format_brl(plan.monthly_price),
            format_brl(plan.annual_price())
        )?;
        writeln!(self.writer, "  {}", plan.description)?;
        for feature in &plan.features {
            writeln!(self.writer, "  - {feature}")?;
        }
        Ok(())
    }

    pub fn write_installment_options(&mut self, options: &[InstallmentQuote]) -> io::Result<()> {
        for quote in options {
            writeln!(self.writer, "{}", quote.option_label())?;
        }
        Ok(())
    }

    pub fn write_field_errors(&mut self, errors: &FieldErrors) -> io::Result<()> {
        for (field, message) in errors.iter() {
            writeln!(self.writer, "{field}: {message}")?;
        }
        Ok(())
    }

    pub fn write_gateway_status(&mut self, status: &GatewayStatus) -> io::Result<()> {
        let label = match status.state {
            GatewayState::Idle => "aguardando".to_string(),
            GatewayState::Loading { url_index } => format!("carregando (URL {})", url_index + 1),
            GatewayState::Loaded => "pronto".to_string(),
            GatewayState::Failed => "falhou".to_string(),
            GatewayState::TimedOut => "tempo esgotado".to_string(),
        };
        writeln!(self.writer, "Sistema de pagamento: {label}")?;
        if status.retry_count > 0 {
            writeln!(self.writer, "Tentativas: {}", status.retry_count)?;
        }
        Ok(())
    }

    pub fn write_receipt(&mut self, receipt: &PaymentReceipt) -> io::Result<()> {
        writeln!(self.writer, "Pagamento aprovado!")?;
        writeln!(self.writer, "Plano: {}", receipt.plan_name)?;
        writeln!(self.writer, "Valor: {}", receipt.quote.summary())?;
        writeln!(self.writer, "{}", receipt.quote.description())
    }

    pub fn write_pix_session(&mut self, session: &PixSession) -> io::Result<()> {
        writeln!(self.writer, "PIX gerado com sucesso!")?;
        writeln!(self.writer, "Código PIX: {}", session.payload())?;
        writeln!(
            self.writer,
            "QR Code (PNG base64): {} bytes",
            session.qr_code_base64().len()
        )?;
        if let Some(expires_at) = session.expires_at() {
            writeln!(
                self.writer,
                "Expira em: {}",
                expires_at.format("%d/%m/%Y %H:%M:%S")
            )?;
        }
        self.write_pix_status(session.status())
    }

    pub fn write_pix_status(&mut self, status: PixStatus) -> io::Result<()> {
        match status {
            PixStatus::Active { remaining_secs } => writeln!(
                self.writer,
                "Tempo restante: {}",
                format_countdown(remaining_secs)
            ),
            PixStatus::Expired => writeln!(self.writer, "PIX expirado"),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
