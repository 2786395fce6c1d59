//! Lectura de la salida de texto del worker.
//!
//! La política es "best effort": una línea que no se puede leer como número
//! deja esa métrica en 0 y el nombre de la métrica queda en `degraded` para
//! que quien llama lo registre. Nunca se aborta por una métrica mala.

use crate::entity::ModelMetrics;
use crate::job::InferenceResponse;

/// Orden en que el worker imprime las métricas al final de un entrenamiento.
pub const TRAINING_METRICS: [&str; 8] = [
    "unoptimized_validation_accuracy",
    "unoptimized_validation_recall",
    "unoptimized_test_accuracy",
    "unoptimized_test_recall",
    "validation_accuracy",
    "validation_recall",
    "test_accuracy",
    "test_recall",
];

pub const INFERENCE_METRICS: [&str; 2] = ["precision", "recall"];

/// Valor parseado más la lista de métricas que quedaron en 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub degraded: Vec<&'static str>,
}

impl<T> Parsed<T> {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Quita un salto de línea final y parte en líneas.
pub fn split_lines(output: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(output);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    text.split('\n')
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

fn parse_metric(line: Option<&String>) -> Option<f64> {
    line.and_then(|l| l.trim().parse::<f64>().ok())
}

/// Las últimas 8 líneas, en el orden de `TRAINING_METRICS`. Si hay menos de
/// 8 líneas, las que faltan cuentan como degradadas.
pub fn parse_training_metrics(lines: &[String]) -> Parsed<ModelMetrics> {
    let n = TRAINING_METRICS.len();
    let window = &lines[lines.len().saturating_sub(n)..];
    let missing = n - window.len();

    let mut values = [0.0; 8];
    let mut degraded = Vec::new();

    for (i, name) in TRAINING_METRICS.iter().enumerate() {
        let line = i.checked_sub(missing).and_then(|j| window.get(j));
        match parse_metric(line) {
            Some(v) => values[i] = v,
            None => degraded.push(*name),
        }
    }

    Parsed {
        value: ModelMetrics::from_ordered(values),
        degraded,
    }
}

/// Las dos primeras líneas: precision y recall.
pub fn parse_inference_metrics(lines: &[String]) -> Parsed<InferenceResponse> {
    let mut degraded = Vec::new();
    let mut read = |idx: usize| match parse_metric(lines.get(idx)) {
        Some(v) => v,
        None => {
            degraded.push(INFERENCE_METRICS[idx]);
            0.0
        }
    };

    let precision = read(0);
    let recall = read(1);

    Parsed {
        value: InferenceResponse { precision, recall },
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_trims_single_trailing_newline() {
        assert_eq!(split_lines(b"a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines(b"a\nb\n\n"), vec!["a", "b", ""]);
        assert_eq!(split_lines(b""), vec![""]);
    }

    #[test]
    fn training_metrics_in_documented_order() {
        let lines = split_lines(b"0.1\n0.2\n0.3\n0.4\n0.5\n0.6\n0.7\n0.8\n");
        let parsed = parse_training_metrics(&lines);

        assert!(!parsed.is_degraded());
        let m = parsed.value;
        assert_eq!(m.unoptimized_validation_accuracy, 0.1);
        assert_eq!(m.unoptimized_validation_recall, 0.2);
        assert_eq!(m.unoptimized_test_accuracy, 0.3);
        assert_eq!(m.unoptimized_test_recall, 0.4);
        assert_eq!(m.validation_accuracy, 0.5);
        assert_eq!(m.validation_recall, 0.6);
        assert_eq!(m.test_accuracy, 0.7);
        assert_eq!(m.test_recall, 0.8);
    }

    #[test]
    fn training_uses_only_the_last_eight_lines() {
        let out = b"{'task': 'train'}\ndata binned\nrf classifier created\n0\n0\n0\n0\n0.91\n0.82\n0.9\n0.8\n";
        let parsed = parse_training_metrics(&split_lines(out));

        assert!(!parsed.is_degraded());
        assert_eq!(parsed.value.validation_accuracy, 0.91);
        assert_eq!(parsed.value.test_recall, 0.8);
    }

    #[test]
    fn bad_training_lines_default_to_zero() {
        let out = b"0.1\n0.2\n0.3\n0.4\n0.5\n0.6\noops\nnope\n";
        let parsed = parse_training_metrics(&split_lines(out));

        assert_eq!(parsed.degraded, vec!["test_accuracy", "test_recall"]);
        assert_eq!(parsed.value.validation_recall, 0.6);
        assert_eq!(parsed.value.test_accuracy, 0.0);
        assert_eq!(parsed.value.test_recall, 0.0);
    }

    #[test]
    fn short_training_output_degrades_leading_metrics() {
        let parsed = parse_training_metrics(&split_lines(b"0.7\n0.8\n"));

        assert_eq!(parsed.degraded.len(), 6);
        assert_eq!(parsed.degraded[0], "unoptimized_validation_accuracy");
        assert_eq!(parsed.value.test_accuracy, 0.7);
        assert_eq!(parsed.value.test_recall, 0.8);
    }

    #[test]
    fn inference_reads_first_two_lines() {
        let parsed = parse_inference_metrics(&split_lines(b"0.75\n0.5\ntrailing noise\n"));
        assert!(!parsed.is_degraded());
        assert_eq!(parsed.value, InferenceResponse { precision: 0.75, recall: 0.5 });
    }

    #[test]
    fn inference_garbage_is_degraded() {
        let parsed = parse_inference_metrics(&split_lines(b"model not found, exiting...\n"));
        assert_eq!(parsed.degraded, vec!["precision", "recall"]);
        assert_eq!(parsed.value, InferenceResponse { precision: 0.0, recall: 0.0 });
    }
}
