use rand::Rng;
use rayon::prelude::*;
use std::time::Instant;

use cryptoface::prelude::*;

const USERS: usize = 8;

fn main() -> cryptoface::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let client = ClientConfig::from_env()?;
    let dimension = ServerConfig::from_env()?.dimension;
    let mut rng = rand::thread_rng();

    let start = Instant::now();
    let scheme = Paillier::new(client.parameters);
    let (pk, sk) = scheme.generate_keys()?;
    println!("Time needed to generate keys: {:?}", start.elapsed());

    // Random faces, then a probe close to one of them
    let faces: Vec<Embedding> = (0..USERS)
        .map(|_| Embedding::random_normalized(dimension, &mut rng))
        .collect();
    let target = rng.gen_range(0..USERS);
    let probe: Vec<f64> = faces[target]
        .iter()
        .map(|v| v + rng.gen_range(-1e-3..1e-3))
        .collect();

    let start = Instant::now();
    let enrolled = faces
        .iter()
        .map(|face| encode_embedding(&scheme, face, &pk))
        .collect::<cryptoface::Result<Vec<_>>>()?;
    let elapsed = start.elapsed();
    println!("Time needed to encrypt {} faces: {:?}", USERS, elapsed);
    println!("Time needed to encrypt 1 face: {:?}", elapsed / USERS as u32);

    let start = Instant::now();
    let distances = enrolled
        .par_iter()
        .map(|face| secure_distance(&scheme, &probe, face, &pk))
        .collect::<cryptoface::Result<Vec<_>>>()?;
    let elapsed = start.elapsed();
    println!("Time needed to compute {} encrypted distances: {:?}", USERS, elapsed);

    let start = Instant::now();
    let candidates = distances
        .iter()
        .enumerate()
        .map(|(i, d)| Ok(Candidate::new(format!("user-{i}"), scheme.decrypt(d, &sk)?)))
        .collect::<cryptoface::Result<Vec<_>>>()?;
    println!("Time needed to decrypt {} distances: {:?}", USERS, start.elapsed());

    let ranker = Ranker::new(client.threshold);
    println!("Probe taken from user-{target}");
    println!("{}", ranker.verdict(candidates[target].distance));
    println!("{}", ranker.rank(candidates));

    Ok(())
}
