// Aggregate statistics over survey responses
//
// The computation is a pure function over `ScoreRow`s so it can be tested
// without a database. `RATING_FIELDS` drives both the SQL projection and
// the shape of the averages map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Rated fields per section, in projection order
pub const RATING_FIELDS: &[(&str, &[&str])] = &[
    ("pre_encontro", &["facilidade_inscricao", "comunicacao_previa"]),
    ("palestras", &["conteudo", "clareza", "duracao", "palestrantes"]),
    ("ambientes", &["conforto", "limpeza", "acustica", "climatizacao"]),
    ("refeicoes", &["qualidade", "quantidade", "variedade", "atendimento"]),
    ("musicas", &["selecao", "execucao", "volume"]),
    ("equipe", &["acolhimento", "organizacao", "pontualidade", "disponibilidade"]),
    ("avaliacao_geral", &["nota_geral", "expectativas_atendidas"]),
];

/// Iterate `(section, field)` pairs in projection order
pub fn rating_columns() -> impl Iterator<Item = (&'static str, &'static str)> {
    RATING_FIELDS
        .iter()
        .flat_map(|(section, fields)| fields.iter().map(move |field| (*section, *field)))
}

fn nota_geral_index() -> usize {
    rating_columns()
        .position(|column| column == ("avaliacao_geral", "nota_geral"))
        .unwrap_or(0)
}

/// Ratings of one response; a missing section yields `None`s
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub ratings: Vec<Option<i64>>,
    pub recomendaria: Option<bool>,
    pub interesse: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Estatisticas {
    pub total_avaliacoes: i64,
    /// Average per section and field, two decimals, null without responses
    #[schema(value_type = Object)]
    pub medias: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    /// Count of `nota_geral` values 0 through 5
    pub distribuicao_nota_geral: Vec<i64>,
    pub percentual_recomendaria: Option<f64>,
    pub total_interessados_pastoral: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the dashboard statistics for a set of responses
pub fn compute(rows: &[ScoreRow]) -> Estatisticas {
    let columns: Vec<(&str, &str)> = rating_columns().collect();
    let mut sums = vec![(0i64, 0i64); columns.len()];
    let mut distribuicao = vec![0i64; 6];
    let nota_idx = nota_geral_index();

    let mut recomendaria_yes = 0i64;
    let mut recomendaria_answered = 0i64;
    let mut interessados = 0i64;

    for row in rows {
        for (i, rating) in row.ratings.iter().enumerate().take(columns.len()) {
            if let Some(value) = rating {
                sums[i].0 += value;
                sums[i].1 += 1;
            }
        }

        if let Some(Some(nota)) = row.ratings.get(nota_idx) {
            if let Some(bucket) = usize::try_from(*nota).ok().and_then(|n| distribuicao.get_mut(n)) {
                *bucket += 1;
            }
        }

        if let Some(recomendaria) = row.recomendaria {
            recomendaria_answered += 1;
            if recomendaria {
                recomendaria_yes += 1;
            }
        }

        if row.interesse == Some(true) {
            interessados += 1;
        }
    }

    let mut medias: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for ((section, field), (sum, count)) in columns.iter().zip(sums) {
        let average = (count > 0).then(|| round2(sum as f64 / count as f64));
        medias
            .entry(section.to_string())
            .or_default()
            .insert(field.to_string(), average);
    }

    let percentual_recomendaria = (recomendaria_answered > 0)
        .then(|| round2(recomendaria_yes as f64 * 100.0 / recomendaria_answered as f64));

    Estatisticas {
        total_avaliacoes: rows.len() as i64,
        medias,
        distribuicao_nota_geral: distribuicao,
        percentual_recomendaria,
        total_interessados_pastoral: interessados,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(nota: i64, recomendaria: bool, interesse: bool) -> ScoreRow {
        ScoreRow {
            ratings: vec![Some(nota); rating_columns().count()],
            recomendaria: Some(recomendaria),
            interesse: Some(interesse),
        }
    }

    #[test]
    fn test_empty_input_has_null_averages() {
        let stats = compute(&[]);
        assert_eq!(stats.total_avaliacoes, 0);
        assert_eq!(stats.medias["palestras"]["clareza"], None);
        assert_eq!(stats.distribuicao_nota_geral, vec![0; 6]);
        assert_eq!(stats.percentual_recomendaria, None);
        assert_eq!(stats.total_interessados_pastoral, 0);
    }

    #[test]
    fn test_averages_rounded_to_two_decimals() {
        let stats = compute(&[row(5, true, false), row(4, true, true), row(4, false, false)]);
        assert_eq!(stats.total_avaliacoes, 3);
        assert_eq!(stats.medias["equipe"]["acolhimento"], Some(4.33));
        assert_eq!(stats.distribuicao_nota_geral, vec![0, 0, 0, 0, 2, 1]);
        assert_eq!(stats.percentual_recomendaria, Some(66.67));
        assert_eq!(stats.total_interessados_pastoral, 1);
    }

    #[test]
    fn test_missing_sections_are_skipped() {
        let mut partial = row(2, true, false);
        partial.ratings = vec![None; rating_columns().count()];
        partial.recomendaria = None;

        let stats = compute(&[row(4, true, false), partial]);
        assert_eq!(stats.total_avaliacoes, 2);
        assert_eq!(stats.medias["musicas"]["volume"], Some(4.0));
        assert_eq!(stats.percentual_recomendaria, Some(100.0));
    }

    #[test]
    fn test_every_section_is_reported() {
        let stats = compute(&[]);
        for (section, fields) in RATING_FIELDS {
            for field in *fields {
                assert!(stats.medias[*section].contains_key(*field));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_distribution_and_bounds(
            notas in proptest::collection::vec((0i64..=5, any::<bool>(), any::<bool>()), 0..50)
        ) {
            let rows: Vec<ScoreRow> = notas.iter().map(|(n, r, i)| row(*n, *r, *i)).collect();
            let stats = compute(&rows);

            prop_assert_eq!(stats.distribuicao_nota_geral.iter().sum::<i64>(), rows.len() as i64);
            for fields in stats.medias.values() {
                for average in fields.values().flatten() {
                    prop_assert!((0.0..=5.0).contains(average));
                }
            }
            if let Some(pct) = stats.percentual_recomendaria {
                prop_assert!((0.0..=100.0).contains(&pct));
            }
            prop_assert!(stats.total_interessados_pastoral <= stats.total_avaliacoes);
        }
    }
}
