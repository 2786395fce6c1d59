use std::{collections::VecDeque, env, path::Path, process::Stdio};

use common::TaskKind;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
    time::timeout,
};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Líneas de stderr que se guardan para el mensaje de error.
const STDERR_TAIL_LINES: usize = 20;

/// Qué salida del worker se devuelve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCapture {
    /// stdout y stderr intercalados, en el orden en que llegan.
    ///
    /// Son dos pipes distintos: cada stream conserva su orden, pero entre
    /// ellos el orden depende de cuándo se leyó cada línea. Un worker que
    /// escribe en stderr después de imprimir las métricas puede dejar esa
    /// línea dentro de las últimas 8; el parser la registra como métrica
    /// degradada.
    Combined,
    /// Sólo stdout; stderr queda para el mensaje de error.
    StdoutOnly,
}

impl OutputCapture {
    /// Inferencia lee sólo stdout; entrenamiento y árboles leen todo.
    pub fn for_kind(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Infer => OutputCapture::StdoutOnly,
            TaskKind::Train | TaskKind::ShowTrees => OutputCapture::Combined,
        }
    }
}

/// Lanza `<interpreter> <script> <descriptor_path>` y bloquea hasta que
/// termine. Un fallo al lanzar, un exit code distinto de 0 o el timeout son
/// errores; en ese caso no se devuelve salida.
pub async fn invoke(
    config: &ServiceConfig,
    descriptor_path: &Path,
    capture: OutputCapture,
) -> Result<Vec<u8>, ServiceError> {
    let mut cmd = Command::new(&config.worker_interpreter);
    cmd.arg(&config.worker_script)
        .arg(descriptor_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(ref extra) = config.worker_extra_path {
        let path = env::var("PATH").unwrap_or_default();
        cmd.env("PATH", format!("{path}:{extra}"));
    }

    info!(
        "lanzando worker: {} {} {}",
        config.worker_interpreter,
        config.worker_script.display(),
        descriptor_path.display()
    );

    let mut child = cmd.spawn().map_err(|e| {
        warn!("no se pudo lanzar el worker: {}", e);
        ServiceError::WorkerInvocationFailed(format!(
            "could not start {}: {e}",
            config.worker_interpreter
        ))
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ServiceError::Internal("worker stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ServiceError::Internal("worker stderr not captured".to_string()))?;

    let run = async {
        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let mut output: Vec<u8> = Vec::new();
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let (mut out_done, mut err_done) = (false, false);

        while !(out_done && err_done) {
            tokio::select! {
                seg = out_lines.next_segment(), if !out_done => match seg {
                    Ok(Some(line)) => {
                        output.extend_from_slice(&line);
                        output.push(b'\n');
                    }
                    _ => out_done = true,
                },
                seg = err_lines.next_segment(), if !err_done => match seg {
                    Ok(Some(line)) => {
                        if capture == OutputCapture::Combined {
                            output.extend_from_slice(&line);
                            output.push(b'\n');
                        }
                        if stderr_tail.len() == STDERR_TAIL_LINES {
                            stderr_tail.pop_front();
                        }
                        stderr_tail.push_back(String::from_utf8_lossy(&line).into_owned());
                    }
                    _ => err_done = true,
                },
            }
        }

        let status = child.wait().await;
        (output, stderr_tail, status)
    };

    let finished = timeout(config.worker_timeout, run).await;
    let (output, stderr_tail, status) = match finished {
        Ok(done) => done,
        Err(_) => {
            let secs = config.worker_timeout.as_secs();
            warn!("worker superó el timeout de {}s, matando el proceso", secs);
            let _ = child.kill().await;
            return Err(ServiceError::WorkerTimeout { secs });
        }
    };

    let status = status.map_err(|e| {
        ServiceError::WorkerInvocationFailed(format!("could not wait for worker: {e}"))
    })?;

    if !status.success() {
        let tail: Vec<String> = stderr_tail.into_iter().collect();
        warn!("worker terminó con {}: {}", status, tail.join(" | "));
        return Err(ServiceError::WorkerInvocationFailed(format!(
            "{status}; stderr: {}",
            tail.join("\n")
        )));
    }

    info!("worker terminó con {} ({} bytes de salida)", status, output.len());
    Ok(output)
}
